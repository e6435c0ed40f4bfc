use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::BotError;

/// Absolute screen coordinate in client pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn shifted(self, by: Offset) -> Self {
        Self { x: self.x + by.dx, y: self.y + by.dy }
    }
}

/// Relative displacement used for click offsets and drags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
}

impl Offset {
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

/// A visual landmark: image asset plus the minimum accepted match score.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub path: PathBuf,
    pub confidence: f64,
    pub offset: Offset,
}

impl Template {
    pub fn new(path: impl Into<PathBuf>, confidence: f64) -> Self {
        Self { path: path.into(), confidence, offset: Offset::default() }
    }

    /// Same image, different acceptance threshold.
    pub fn at(&self, confidence: f64) -> Self {
        Self { confidence, ..self.clone() }
    }

    pub fn with_offset(mut self, offset: Offset) -> Self {
        self.offset = offset;
        self
    }

    /// Lowercased file stem, e.g. `assets/other/notice.PNG` -> `notice`.
    pub fn name(&self) -> String {
        stem_of(&self.path)
    }
}

pub(crate) fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Result of one probe attempt. Consumed immediately, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProbeOutcome {
    pub matched: bool,
    pub location: Option<Point>,
}

/// Attempt budget for a bounded poll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollBudget {
    pub max_attempts: u32,
    pub delay_secs: f64,
}

impl PollBudget {
    pub const STANDARD: PollBudget = PollBudget { max_attempts: 60, delay_secs: 0.7 };
    pub const REFRESH: PollBudget = PollBudget { max_attempts: 3, delay_secs: 0.7 };
    pub const EXCHANGE: PollBudget = PollBudget { max_attempts: 600, delay_secs: 0.0 };

    pub fn new(max_attempts: u32, delay_secs: f64) -> Result<Self, BotError> {
        let budget = Self { max_attempts, delay_secs };
        budget.validate("poll")?;
        Ok(budget)
    }

    pub fn validate(&self, what: &str) -> Result<(), BotError> {
        if self.max_attempts == 0 {
            return Err(BotError::Config(format!("{} budget needs at least one attempt", what)));
        }
        if !self.delay_secs.is_finite() || self.delay_secs < 0.0 {
            return Err(BotError::Config(format!("{} delay must be a non-negative number", what)));
        }
        Ok(())
    }
}

impl Default for PollBudget {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// First cycle runs the one-time setup phases; steady cycles skip them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleMode {
    #[default]
    First,
    Steady,
}

impl fmt::Display for CycleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleMode::First => write!(f, "first"),
            CycleMode::Steady => write!(f, "steady"),
        }
    }
}

/// Process-lifetime recovery counter. Only ever grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    count: u32,
    limit: u32,
}

impl RetryBudget {
    pub fn new(limit: u32) -> Self {
        Self { count: 0, limit }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// True once `limit` recoveries have been spent.
    pub fn exhausted(&self) -> bool {
        self.count >= self.limit
    }

    pub(crate) fn record(&mut self) {
        self.count += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Navigate,
    SupportSelect,
    QuestStart,
    Combat,
    Result,
    ReSortie,
    Summon,
    BoxOpen,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Navigate => "navigate",
            Phase::SupportSelect => "support-select",
            Phase::QuestStart => "quest-start",
            Phase::Combat => "combat",
            Phase::Result => "result",
            Phase::ReSortie => "re-sortie",
            Phase::Summon => "summon",
            Phase::BoxOpen => "box-open",
        };
        write!(f, "{}", s)
    }
}

/// Which state graph the supervisor drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    #[default]
    Farm,
    FriendPointSummon,
    EventBox,
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Farm => write!(f, "farm"),
            Flow::FriendPointSummon => write!(f, "friend-point summon"),
            Flow::EventBox => write!(f, "event box"),
        }
    }
}

/// Party preset selected before the first quest start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyKind {
    FriendPoint,
    #[default]
    Orbit,
    Qp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    Running,
    Stopping,
    #[default]
    Stopped,
    Failed,
}

/// Live view of the run, shared with the TUI.
#[derive(Debug, Clone, Default)]
pub struct RunStatus {
    pub state: RunState,
    pub flow: Flow,
    pub mode: CycleMode,
    pub phase: Option<Phase>,
    pub cycles: u64,
    pub recoveries: u32,
    pub retry_limit: u32,
    pub last_error: Option<String>,
}

pub type SharedStatus = Arc<Mutex<RunStatus>>;

pub fn shared_status() -> SharedStatus {
    Arc::new(Mutex::new(RunStatus::default()))
}
