//! Bounded retry of a boolean step. Every multi-attempt wait in the bot
//! is one of these with its own attempt counter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::BotError;
use crate::logger;
use crate::probe::Screen;
use crate::types::PollBudget;

/// Out-of-band stop request, checked before every attempt and at cycle
/// boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub struct BoundedPoll<'a> {
    step: &'a str,
    budget: PollBudget,
}

impl<'a> BoundedPoll<'a> {
    pub fn new(step: &'a str, budget: PollBudget) -> Self {
        Self { step, budget }
    }

    /// Poll `check` until it holds. See [`BoundedPoll::until_or`].
    pub fn until<C>(&self, screen: &mut Screen, check: C) -> Result<u32, BotError>
    where
        C: FnMut(&mut Screen) -> Result<bool, BotError>,
    {
        self.until_or(screen, check, |_| Ok(()))
    }

    /// Run `check` up to `max_attempts` times. After each miss `fallback`
    /// runs; the delay is slept between attempts but not after the last
    /// one. Returns the number of attempts used, or `Stall` on exhaustion.
    pub fn until_or<C, F>(&self, screen: &mut Screen, mut check: C, mut fallback: F) -> Result<u32, BotError>
    where
        C: FnMut(&mut Screen) -> Result<bool, BotError>,
        F: FnMut(&mut Screen) -> Result<(), BotError>,
    {
        let max = self.budget.max_attempts.max(1);
        let mut attempts = 0;
        loop {
            screen.check_cancel()?;
            attempts += 1;
            if check(screen)? {
                if attempts > 1 {
                    logger::info_p("poll", &format!("{}: ok after {} attempts", self.step, attempts));
                }
                return Ok(attempts);
            }
            fallback(screen)?;
            if attempts >= max {
                logger::warn_p("poll", &format!("{}: gave up after {} attempts", self.step, attempts));
                return Err(BotError::stall(self.step, attempts));
            }
            screen.wait(self.budget.delay_secs);
        }
    }
}
