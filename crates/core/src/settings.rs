use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::combat::BattleCommand;
use crate::error::BotError;
use crate::logger;
use crate::types::{Flow, PartyKind, PollBudget};

/// A program plus leading arguments, e.g. `ssh ops@host notify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub program_name: String,
    pub assets_dir: PathBuf,
    pub flow: Flow,
    pub party: PartyKind,
    /// 1-based desired quest among the discovered map templates; 0 takes
    /// the first one found.
    pub map_number: u32,
    pub max_cycles: Option<u64>,
    pub poll: PollBudget,
    pub refresh: PollBudget,
    pub exchange: PollBudget,
    pub retry_limit: u32,
    pub helper: Option<ExternalCommand>,
    pub notify: Option<ExternalCommand>,
    pub battle: Vec<BattleCommand>,
    pub jitter: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            program_name: "sortie".into(),
            assets_dir: PathBuf::from("assets"),
            flow: Flow::Farm,
            party: PartyKind::Orbit,
            map_number: 0,
            max_cycles: None,
            poll: PollBudget::STANDARD,
            refresh: PollBudget::REFRESH,
            exchange: PollBudget::EXCHANGE,
            retry_limit: 3,
            helper: None,
            notify: None,
            battle: Vec::new(),
            jitter: true,
        }
    }
}

impl Settings {
    /// Load from `path`. A missing or unreadable file yields defaults.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(s) => s,
            Err(e) => {
                logger::warn(&format!("using default settings: {:#}", e));
                Self::default()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }

    /// Reject budgets and battle slots that could never work.
    pub fn validate(&self) -> Result<(), BotError> {
        self.poll.validate("poll")?;
        self.refresh.validate("refresh")?;
        self.exchange.validate("exchange")?;
        for (i, cmd) in self.battle.iter().enumerate() {
            cmd.validate()
                .map_err(|e| BotError::Config(format!("battle step {}: {}", i + 1, e)))?;
        }
        Ok(())
    }
}
