use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};

use crate::logger;
use crate::settings::ExternalCommand;

/// Operator channel. Delivery is best effort.
pub trait Notifier: Send {
    fn notify(&mut self, program: &str, headline: &str, detail: &str) -> Result<()>;
}

/// Only writes the notification to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, program: &str, headline: &str, detail: &str) -> Result<()> {
        let headline = headline.replace('\n', " / ");
        if detail.is_empty() {
            logger::info_p("notify", &format!("[{}] {}", program, headline));
        } else {
            logger::info_p("notify", &format!("[{}] {} ({})", program, headline, detail));
        }
        Ok(())
    }
}

/// Runs the configured command with program, headline and detail appended.
pub struct CommandNotifier {
    command: ExternalCommand,
}

impl CommandNotifier {
    pub fn new(command: ExternalCommand) -> Self {
        Self { command }
    }
}

impl Notifier for CommandNotifier {
    fn notify(&mut self, program: &str, headline: &str, detail: &str) -> Result<()> {
        let status = Command::new(&self.command.program)
            .args(&self.command.args)
            .args([program, headline, detail])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("spawning notifier {}", self.command.program))?;
        if !status.success() {
            bail!("notifier exited with {}", status);
        }
        LogNotifier.notify(program, headline, detail)
    }
}

pub fn create_notifier(command: Option<&ExternalCommand>) -> Box<dyn Notifier> {
    match command {
        Some(c) => Box::new(CommandNotifier::new(c.clone())),
        None => Box::new(LogNotifier),
    }
}
