//! Variant flows built from the same probe/poll substrate as the farm
//! cycle, plus the factory that picks one from settings.

use crate::error::BotError;
use crate::landmarks::{Landmarks, DEAD_ZONE, EVENT_BOX_SLOT, EXCHANGE_HOTSPOT, SCREEN_CENTER};
use crate::logger;
use crate::orchestrator::{Budgets, Cycle, FarmCycle};
use crate::poll::BoundedPoll;
use crate::probe::Screen;
use crate::session::Session;
use crate::settings::Settings;
use crate::types::*;

/// Ten-draw friend point summons, repeated.
pub struct FriendPointSummon {
    lm: Landmarks,
    poll: PollBudget,
}

impl FriendPointSummon {
    pub fn new(lm: Landmarks, poll: PollBudget) -> Self {
        Self { lm, poll }
    }

    /// From the result screen of the previous draw straight into the next.
    fn draw_again(&self, s: &mut Screen) -> Result<(), BotError> {
        let lm = &self.lm;
        // leftover confirm dialogs count against the same budget as the
        // dead-zone taps, so a dialog that never goes away still stalls
        BoundedPoll::new("summon again", self.poll).until(s, |s| {
            if s.tap_if_seen(&lm.decide_summon)? {
                return Ok(false);
            }
            if s.tap_if_seen(&lm.summon_again)? {
                return Ok(true);
            }
            s.tap(DEAD_ZONE)?;
            Ok(false)
        })?;
        Ok(())
    }

    /// From the home screen to the first ten-draw.
    fn open_summon(&self, s: &mut Screen) -> Result<(), BotError> {
        let lm = &self.lm;
        BoundedPoll::new("menu", self.poll)
            .until_or(s, |s| s.tap_if_seen(&lm.menu), |s| s.tap(DEAD_ZONE).map(drop))?;
        s.wait(4.5);
        BoundedPoll::new("summon", self.poll).until(s, |s| s.tap_if_seen(&lm.summon))?;

        let banner_edge = SCREEN_CENTER.shifted(Offset::new(800, 0));
        BoundedPoll::new("friend point summon", self.poll).until_or(
            s,
            |s| s.seen(&lm.friend_point_summon),
            |s| s.drag(banner_edge, Offset::new(-SCREEN_CENTER.x, 0), 0.3).map(drop),
        )?;
        BoundedPoll::new("ten draw", self.poll).until(s, |s| s.tap_if_seen(&lm.summon_10))?;
        Ok(())
    }
}

impl Cycle for FriendPointSummon {
    fn run_cycle(&mut self, s: &mut Screen, session: &mut Session) -> Result<(), BotError> {
        s.check_cancel()?;
        session.enter(Phase::Summon);
        match session.mode() {
            CycleMode::First => self.open_summon(s)?,
            CycleMode::Steady => self.draw_again(s)?,
        }
        BoundedPoll::new("summon confirm", self.poll).until(s, |s| s.tap_if_seen(&self.lm.decide_summon))?;
        Ok(())
    }
}

/// Lottery box exchange: tap the exchange button until the box is empty,
/// then reset it.
pub struct EventBox {
    lm: Landmarks,
    exchange: PollBudget,
}

impl EventBox {
    pub fn new(lm: Landmarks, exchange: PollBudget) -> Self {
        Self { lm, exchange }
    }
}

impl Cycle for EventBox {
    fn run_cycle(&mut self, s: &mut Screen, session: &mut Session) -> Result<(), BotError> {
        let lm = &self.lm;
        s.check_cancel()?;
        session.enter(Phase::BoxOpen);
        if session.mode() == CycleMode::First {
            s.tap_if_seen(&lm.event_reward)?;
            s.tap(EVENT_BOX_SLOT)?;
            s.wait(4.5);
        }
        let taps = BoundedPoll::new("box reset", self.exchange)
            .until_or(s, |s| s.tap_if_seen(&lm.event_box_reset), |s| s.tap(EXCHANGE_HOTSPOT).map(drop))?;
        logger::info_p("cycle", &format!("box emptied after {} exchange taps", taps - 1));
        s.tap_if_seen(&lm.event_run)?;
        s.tap_if_seen(&lm.event_close)?;
        Ok(())
    }
}

/// Build the cycle the settings select.
pub fn build_cycle(settings: &Settings) -> Box<dyn Cycle + Send> {
    let lm = Landmarks::new(&settings.assets_dir);
    let budgets = Budgets::from_settings(settings);
    match settings.flow {
        Flow::Farm => Box::new(FarmCycle::from_settings(settings)),
        Flow::FriendPointSummon => Box::new(FriendPointSummon::new(lm, budgets.poll)),
        Flow::EventBox => Box::new(EventBox::new(lm, budgets.exchange)),
    }
}
