//! Failure boundary around the cycle loop: any recoverable error becomes
//! kill + relaunch + resume from the first phase, until the retry budget
//! runs out.

use crate::error::BotError;
use crate::logger;
use crate::notify::Notifier;
use crate::orchestrator::Cycle;
use crate::probe::Screen;
use crate::session::Session;
use crate::types::*;

const KILL_CONFIDENCE: f64 = 0.95;

/// How a run ended without a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// `max_cycles` cycles finished.
    Completed { cycles: u64 },
    Cancelled,
}

pub struct Supervisor {
    program: String,
    notifier: Box<dyn Notifier>,
    client_icon: Template,
    max_cycles: Option<u64>,
}

impl Supervisor {
    pub fn new(program: impl Into<String>, notifier: Box<dyn Notifier>, client_icon: Template, max_cycles: Option<u64>) -> Self {
        Self { program: program.into(), notifier, client_icon, max_cycles }
    }

    /// Run cycles until cancelled, `max_cycles` is reached or recovery
    /// gives up.
    pub fn run(&mut self, screen: &mut Screen, session: &mut Session, cycle: &mut dyn Cycle) -> Result<RunEnd, BotError> {
        set_state(session, RunState::Running, None);
        logger::info_p("cycle", &format!("run started, retry limit {}", session.retries().limit()));
        loop {
            if screen.cancel_token().is_cancelled() {
                return Ok(self.stopped(session));
            }
            if let Some(max) = self.max_cycles {
                if session.cycles() >= max {
                    logger::info_p("cycle", &format!("{} cycle(s) done", session.cycles()));
                    set_state(session, RunState::Stopped, None);
                    return Ok(RunEnd::Completed { cycles: session.cycles() });
                }
            }

            match cycle.run_cycle(screen, session) {
                Ok(()) => {
                    session.complete_cycle();
                    logger::info_p("cycle", &format!("cycle {} complete", session.cycles()));
                }
                Err(BotError::Cancelled) => return Ok(self.stopped(session)),
                // a stop that lands during the last attempt shows up as a stall
                Err(_) if screen.cancel_token().is_cancelled() => return Ok(self.stopped(session)),
                Err(err) => {
                    let outcome = if err.is_recoverable() { self.recover(screen, session, &err) } else { Err(err) };
                    if let Err(fatal) = outcome {
                        logger::error_p("recovery", &fatal.to_string());
                        set_state(session, RunState::Failed, Some(fatal.to_string()));
                        self.send("run aborted", &fatal.to_string());
                        return Err(fatal);
                    }
                }
            }
        }
    }

    fn stopped(&self, session: &Session) -> RunEnd {
        logger::info("stop requested, run ends");
        set_state(session, RunState::Stopped, None);
        RunEnd::Cancelled
    }

    /// Relaunch the client after `cause`. Any failure in here is fatal.
    fn recover(&mut self, screen: &mut Screen, session: &mut Session, cause: &BotError) -> Result<(), BotError> {
        let retries = session.retries();
        logger::warn_p(
            "recovery",
            &format!("{} (recoveries used {}/{})", cause, retries.count(), retries.limit()),
        );
        set_state(session, RunState::Running, Some(cause.to_string()));
        if retries.exhausted() {
            return Err(BotError::fatal(format!("retry limit {} reached, last error: {}", retries.limit(), cause)));
        }

        self.send("processing anomaly occurred\nrelaunching app", &cause.to_string());

        match screen.platform().kill_client(KILL_CONFIDENCE) {
            Ok(true) => logger::info_p("recovery", "client terminated"),
            Ok(false) => return Err(BotError::fatal("could not terminate the client")),
            Err(e) => return Err(BotError::fatal(format!("terminating the client failed: {:#}", e))),
        }
        match screen.platform().relaunch_client(&self.client_icon) {
            Ok(true) => logger::info_p("recovery", "client relaunched"),
            Ok(false) => return Err(BotError::fatal("could not relaunch the client")),
            Err(e) => return Err(BotError::fatal(format!("relaunching the client failed: {:#}", e))),
        }

        self.send("relaunch succeeded\nresuming", "");
        session.reset_after_recovery();
        Ok(())
    }

    fn send(&mut self, headline: &str, detail: &str) {
        if let Err(e) = self.notifier.notify(&self.program, headline, detail) {
            logger::warn_p("notify", &format!("notification failed: {:#}", e));
        }
    }
}

fn set_state(session: &Session, state: RunState, last_error: Option<String>) {
    if let Ok(mut st) = session.status().lock() {
        st.state = state;
        if last_error.is_some() {
            st.last_error = last_error;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use anyhow::bail;

    use crate::platform::script::ScriptedPlatform;
    use crate::poll::CancelToken;

    #[derive(Clone, Default)]
    struct Outbox(Arc<Mutex<Vec<String>>>);

    impl Notifier for Outbox {
        fn notify(&mut self, _program: &str, headline: &str, _detail: &str) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(headline.to_string());
            Ok(())
        }
    }

    struct Broken;

    impl Notifier for Broken {
        fn notify(&mut self, _: &str, _: &str, _: &str) -> anyhow::Result<()> {
            bail!("no route to operator")
        }
    }

    fn icon() -> Template {
        Template::new("assets/other/client_icon.png", 0.95)
    }

    fn setup(script: &ScriptedPlatform, notifier: Box<dyn Notifier>, max: Option<u64>) -> (Screen, Session, Supervisor) {
        let screen = Screen::new(Box::new(script.clone()), CancelToken::new());
        let session = Session::new(3, shared_status());
        (screen, session, Supervisor::new("sortie", notifier, icon(), max))
    }

    #[test]
    fn three_failures_then_success_completes() {
        let script = ScriptedPlatform::new();
        let outbox = Outbox::default();
        let (mut screen, mut session, mut sup) = setup(&script, Box::new(outbox.clone()), Some(1));

        let mut entered = Vec::new();
        let mut calls = 0;
        let mut body = |_: &mut Screen, session: &mut Session| -> Result<(), BotError> {
            entered.push(session.mode());
            calls += 1;
            if calls <= 3 {
                return Err(BotError::stall("class icon", 60));
            }
            Ok(())
        };
        let end = sup.run(&mut screen, &mut session, &mut body).unwrap();

        assert_eq!(end, RunEnd::Completed { cycles: 1 });
        assert_eq!(session.retries().count(), 3);
        assert_eq!(entered, vec![CycleMode::First; 4]);
        assert_eq!(session.mode(), CycleMode::Steady);
        assert_eq!(script.kills(), 3);
        assert_eq!(script.relaunches(), 3);
        assert_eq!(outbox.0.lock().unwrap().len(), 6);
    }

    #[test]
    fn fourth_failure_is_fatal_without_relaunch() {
        let script = ScriptedPlatform::new();
        let (mut screen, mut session, mut sup) = setup(&script, Box::new(Outbox::default()), None);
        let mut calls = 0;
        let mut body = |_: &mut Screen, _: &mut Session| -> Result<(), BotError> {
            calls += 1;
            Err(BotError::stall("attack button", 60))
        };
        let err = sup.run(&mut screen, &mut session, &mut body).unwrap_err();

        assert!(matches!(err, BotError::Fatal { .. }));
        assert_eq!(calls, 4);
        assert_eq!(script.relaunches(), 3);
        assert_eq!(session.status().lock().unwrap().state, RunState::Failed);
    }

    #[test]
    fn steady_mode_is_reset_by_recovery() {
        let script = ScriptedPlatform::new();
        let (mut screen, mut session, mut sup) = setup(&script, Box::new(Outbox::default()), Some(3));
        let mut entered = Vec::new();
        let mut body = |_: &mut Screen, session: &mut Session| -> Result<(), BotError> {
            entered.push(session.mode());
            if entered.len() == 2 {
                return Err(BotError::Backend(anyhow::anyhow!("capture failed")));
            }
            Ok(())
        };
        sup.run(&mut screen, &mut session, &mut body).unwrap();
        use CycleMode::*;
        assert_eq!(entered, vec![First, Steady, First, Steady]);
    }

    #[test]
    fn kill_failure_is_fatal_immediately() {
        let script = ScriptedPlatform::new();
        script.kill_succeeds(false);
        let (mut screen, mut session, mut sup) = setup(&script, Box::new(Outbox::default()), None);
        let mut body = |_: &mut Screen, _: &mut Session| -> Result<(), BotError> { Err(BotError::stall("menu", 60)) };
        let err = sup.run(&mut screen, &mut session, &mut body).unwrap_err();
        assert!(matches!(err, BotError::Fatal { .. }));
        assert_eq!(script.relaunches(), 0);
        assert_eq!(session.retries().count(), 0);
    }

    #[test]
    fn relaunch_failure_is_fatal_immediately() {
        let script = ScriptedPlatform::new();
        script.relaunch_succeeds(false);
        let (mut screen, mut session, mut sup) = setup(&script, Box::new(Outbox::default()), None);
        let mut body = |_: &mut Screen, _: &mut Session| -> Result<(), BotError> { Err(BotError::stall("menu", 60)) };
        assert!(matches!(sup.run(&mut screen, &mut session, &mut body), Err(BotError::Fatal { .. })));
        assert_eq!(script.kills(), 1);
    }

    #[test]
    fn cancel_stops_without_recovery() {
        let script = ScriptedPlatform::new();
        let (mut screen, mut session, mut sup) = setup(&script, Box::new(Outbox::default()), None);
        let token = screen.cancel_token().clone();
        let mut body = |_: &mut Screen, _: &mut Session| -> Result<(), BotError> {
            token.cancel();
            Err(BotError::Cancelled)
        };
        let end = sup.run(&mut screen, &mut session, &mut body).unwrap();
        assert_eq!(end, RunEnd::Cancelled);
        assert_eq!(script.kills(), 0);
        assert_eq!(session.retries().count(), 0);
        assert_eq!(session.status().lock().unwrap().state, RunState::Stopped);
    }

    #[test]
    fn stop_during_final_attempt_skips_recovery() {
        let script = ScriptedPlatform::new();
        let (mut screen, mut session, mut sup) = setup(&script, Box::new(Outbox::default()), None);
        let token = screen.cancel_token().clone();
        let mut body = |_: &mut Screen, _: &mut Session| -> Result<(), BotError> {
            token.cancel();
            Err(BotError::stall("attack button", 60))
        };
        let end = sup.run(&mut screen, &mut session, &mut body).unwrap();
        assert_eq!(end, RunEnd::Cancelled);
        assert_eq!(script.kills(), 0);
        assert_eq!(script.relaunches(), 0);
        assert_eq!(session.retries().count(), 0);
        assert_eq!(session.status().lock().unwrap().state, RunState::Stopped);
    }

    #[test]
    fn broken_notifier_does_not_block_recovery() {
        let script = ScriptedPlatform::new();
        let (mut screen, mut session, mut sup) = setup(&script, Box::new(Broken), Some(1));
        let mut failed = false;
        let mut body = |_: &mut Screen, _: &mut Session| -> Result<(), BotError> {
            if !failed {
                failed = true;
                return Err(BotError::stall("quest start", 60));
            }
            Ok(())
        };
        assert_eq!(sup.run(&mut screen, &mut session, &mut body).unwrap(), RunEnd::Completed { cycles: 1 });
        assert_eq!(script.relaunches(), 1);
    }
}
