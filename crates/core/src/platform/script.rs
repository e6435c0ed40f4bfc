//! In-memory platform driven by per-template answer queues. Used by the
//! unit tests and the scenario harness; handles are cheap clones sharing
//! one recorded call log.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{bail, Result};

use crate::types::*;
use super::Platform;

/// Every call the core made, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Search(String),
    Click(Point),
    Drag(Point, Offset),
    Key(String),
    Sleep(f64),
    Kill,
    Relaunch(String),
}

struct Inner {
    queues: HashMap<String, VecDeque<bool>>,
    defaults: HashMap<String, bool>,
    failing: HashSet<String>,
    locations: HashMap<String, Point>,
    kill_ok: bool,
    relaunch_ok: bool,
    calls: Vec<Call>,
}

#[derive(Clone)]
pub struct ScriptedPlatform {
    inner: Arc<Mutex<Inner>>,
}

impl Default for ScriptedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedPlatform {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                queues: HashMap::new(),
                defaults: HashMap::new(),
                failing: HashSet::new(),
                locations: HashMap::new(),
                kill_ok: true,
                relaunch_ok: true,
                calls: Vec::new(),
            })),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue answers for the next searches of `name`; afterwards the
    /// default for `name` applies (false unless set with `always`).
    pub fn answers(&self, name: &str, answers: impl IntoIterator<Item = bool>) -> &Self {
        self.inner().queues.entry(name.to_string()).or_default().extend(answers);
        self
    }

    pub fn always(&self, name: &str, visible: bool) -> &Self {
        self.inner().defaults.insert(name.to_string(), visible);
        self
    }

    /// Invisible for `misses` searches, visible from then on.
    pub fn appears_after(&self, name: &str, misses: usize) -> &Self {
        self.answers(name, std::iter::repeat(false).take(misses));
        self.always(name, true)
    }

    pub fn fail_search(&self, name: &str) -> &Self {
        self.inner().failing.insert(name.to_string());
        self
    }

    pub fn locate(&self, name: &str, at: Point) -> &Self {
        self.inner().locations.insert(name.to_string(), at);
        self
    }

    pub fn kill_succeeds(&self, ok: bool) -> &Self {
        self.inner().kill_ok = ok;
        self
    }

    pub fn relaunch_succeeds(&self, ok: bool) -> &Self {
        self.inner().relaunch_ok = ok;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner().calls.clear();
    }

    pub fn searches(&self, name: &str) -> usize {
        self.count(|c| matches!(c, Call::Search(n) if n == name))
    }

    pub fn clicks_at(&self, at: Point) -> usize {
        self.count(|c| *c == Call::Click(at))
    }

    pub fn keys(&self, key: &str) -> usize {
        self.count(|c| matches!(c, Call::Key(k) if k == key))
    }

    pub fn drags(&self) -> usize {
        self.count(|c| matches!(c, Call::Drag(..)))
    }

    pub fn sleeps(&self) -> usize {
        self.count(|c| matches!(c, Call::Sleep(_)))
    }

    pub fn kills(&self) -> usize {
        self.count(|c| *c == Call::Kill)
    }

    pub fn relaunches(&self) -> usize {
        self.count(|c| matches!(c, Call::Relaunch(_)))
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.inner().calls.iter().filter(|c| pred(c)).count()
    }
}

impl Platform for ScriptedPlatform {
    fn search_image(&mut self, template: &Template) -> Result<Option<Point>> {
        let name = template.name();
        let mut inner = self.inner();
        inner.calls.push(Call::Search(name.clone()));
        if inner.failing.contains(&name) {
            bail!("vision backend failed on {}", name);
        }
        let queued = inner.queues.get_mut(&name).and_then(|q| q.pop_front());
        let visible = queued.unwrap_or_else(|| inner.defaults.get(&name).copied().unwrap_or(false));
        if !visible {
            return Ok(None);
        }
        Ok(Some(inner.locations.get(&name).copied().unwrap_or(Point::new(100, 100))))
    }

    fn click(&mut self, at: Point) -> Result<bool> {
        self.inner().calls.push(Call::Click(at));
        Ok(true)
    }

    fn drag(&mut self, from: Point, by: Offset, _secs: f64) -> Result<bool> {
        self.inner().calls.push(Call::Drag(from, by));
        Ok(true)
    }

    fn press_key(&mut self, key: &str) -> Result<()> {
        self.inner().calls.push(Call::Key(key.to_string()));
        Ok(())
    }

    fn kill_client(&mut self, _confidence: f64) -> Result<bool> {
        let mut inner = self.inner();
        inner.calls.push(Call::Kill);
        Ok(inner.kill_ok)
    }

    fn relaunch_client(&mut self, icon: &Template) -> Result<bool> {
        let mut inner = self.inner();
        inner.calls.push(Call::Relaunch(icon.name()));
        Ok(inner.relaunch_ok)
    }

    fn sleep(&mut self, secs: f64) {
        self.inner().calls.push(Call::Sleep(secs));
    }
}
