use std::path::Path;

use crate::error::BotError;
use crate::logger;
use crate::targets;
use crate::types::*;

/// Run-wide state threaded through every cycle. Owned by the supervisor.
pub struct Session {
    mode: CycleMode,
    retries: RetryBudget,
    cycles: u64,
    phase: Option<Phase>,
    support: Option<Vec<Template>>,
    status: SharedStatus,
}

impl Session {
    pub fn new(retry_limit: u32, status: SharedStatus) -> Self {
        if let Ok(mut st) = status.lock() {
            st.retry_limit = retry_limit;
            st.mode = CycleMode::First;
        }
        Self {
            mode: CycleMode::First,
            retries: RetryBudget::new(retry_limit),
            cycles: 0,
            phase: None,
            support: None,
            status,
        }
    }

    pub fn mode(&self) -> CycleMode {
        self.mode
    }

    pub fn retries(&self) -> RetryBudget {
        self.retries
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    pub fn status(&self) -> &SharedStatus {
        &self.status
    }

    pub fn enter(&mut self, phase: Phase) {
        self.phase = Some(phase);
        logger::info_p("cycle", &format!("-> {} ({} mode)", phase, self.mode));
        if let Ok(mut st) = self.status.lock() {
            st.phase = Some(phase);
        }
    }

    /// Support templates are discovered once per run.
    pub fn support_targets(&mut self, dir: &Path) -> Result<&[Template], BotError> {
        if self.support.is_none() {
            let found = targets::support_targets(dir)?;
            logger::info_p("cycle", &format!("{} support template(s) under {}", found.len(), dir.display()));
            self.support = Some(found);
        }
        Ok(self.support.as_deref().unwrap_or_default())
    }

    /// A full cycle finished: from now on setup phases are skipped.
    pub(crate) fn complete_cycle(&mut self) {
        self.cycles += 1;
        self.mode = CycleMode::Steady;
        self.phase = None;
        if let Ok(mut st) = self.status.lock() {
            st.cycles = self.cycles;
            st.mode = self.mode;
            st.phase = None;
        }
    }

    /// The client was relaunched and sits on its initial screen again.
    pub(crate) fn reset_after_recovery(&mut self) {
        self.retries.record();
        self.mode = CycleMode::First;
        self.phase = None;
        if let Ok(mut st) = self.status.lock() {
            st.recoveries = self.retries.count();
            st.mode = self.mode;
            st.phase = None;
        }
    }
}
