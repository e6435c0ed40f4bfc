use thiserror::Error;

/// Everything that can end a poll, a phase or a run.
#[derive(Debug, Error)]
pub enum BotError {
    /// A bounded poll ran out of attempts before its condition held.
    #[error("stalled at '{step}' after {attempts} attempts")]
    Stall { step: String, attempts: u32 },

    /// Stop requested from outside. Never triggers a relaunch.
    #[error("cancelled")]
    Cancelled,

    /// Vision/input/notification backend failure.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),

    #[error("config error: {0}")]
    Config(String),

    /// Recovery itself failed or the retry ceiling was hit.
    #[error("fatal: {reason}")]
    Fatal { reason: String },
}

impl BotError {
    pub fn stall(step: impl Into<String>, attempts: u32) -> Self {
        BotError::Stall { step: step.into(), attempts }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        BotError::Fatal { reason: reason.into() }
    }

    /// Whether the supervisor may answer this with a relaunch.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, BotError::Cancelled | BotError::Fatal { .. })
    }
}
