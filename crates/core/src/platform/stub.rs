use anyhow::Result;

use crate::logger;
use crate::sleep;
use crate::types::*;
use super::Platform;

/// Dry-run backend: logs every call, never sees anything, and reports
/// kill/relaunch as successful.
pub struct StubPlatform {
    jitter: bool,
}

impl StubPlatform {
    pub fn new(jitter: bool) -> Self {
        Self { jitter }
    }
}

impl Platform for StubPlatform {
    fn search_image(&mut self, template: &Template) -> Result<Option<Point>> {
        logger::info_p("stub", &format!("search({}, {:.3})", template.name(), template.confidence));
        Ok(None)
    }

    fn click(&mut self, at: Point) -> Result<bool> {
        logger::info_p("stub", &format!("click({}, {})", at.x, at.y));
        Ok(true)
    }

    fn drag(&mut self, from: Point, by: Offset, secs: f64) -> Result<bool> {
        logger::info_p("stub", &format!("drag({}, {}) by ({}, {}) over {:.1}s", from.x, from.y, by.dx, by.dy, secs));
        Ok(true)
    }

    fn press_key(&mut self, key: &str) -> Result<()> {
        logger::info_p("stub", &format!("key(\"{}\")", key));
        Ok(())
    }

    fn kill_client(&mut self, confidence: f64) -> Result<bool> {
        logger::info_p("stub", &format!("kill_client({:.2})", confidence));
        Ok(true)
    }

    fn relaunch_client(&mut self, icon: &Template) -> Result<bool> {
        logger::info_p("stub", &format!("relaunch_client({})", icon.name()));
        Ok(true)
    }

    fn sleep(&mut self, secs: f64) {
        if self.jitter {
            sleep::sleep_jitter(secs);
        } else {
            sleep::sleep_secs(secs);
        }
    }
}
