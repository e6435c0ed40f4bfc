//! The farming cycle: navigate to the quest, pick a support, start,
//! fight, read the result, sortie again.
//!
//! The cycle mode is read once at entry and selects the phase list; the
//! phases themselves never look at it.

use crate::combat::{BattleCommand, Combat};
use crate::error::BotError;
use crate::landmarks::{Landmarks, DEAD_ZONE, LIST_EDGE};
use crate::logger;
use crate::poll::BoundedPoll;
use crate::probe::Screen;
use crate::session::Session;
use crate::settings::Settings;
use crate::targets;
use crate::types::*;

/// One iteration of a flow, run inside the supervisor's failure boundary.
pub trait Cycle {
    fn run_cycle(&mut self, screen: &mut Screen, session: &mut Session) -> Result<(), BotError>;
}

impl<F> Cycle for F
where
    F: FnMut(&mut Screen, &mut Session) -> Result<(), BotError>,
{
    fn run_cycle(&mut self, screen: &mut Screen, session: &mut Session) -> Result<(), BotError> {
        self(screen, session)
    }
}

const FIRST_CYCLE: [Phase; 6] = [
    Phase::Navigate,
    Phase::SupportSelect,
    Phase::QuestStart,
    Phase::Combat,
    Phase::Result,
    Phase::ReSortie,
];

const STEADY_CYCLE: [Phase; 4] = [Phase::SupportSelect, Phase::Combat, Phase::Result, Phase::ReSortie];

pub fn phases(mode: CycleMode) -> &'static [Phase] {
    match mode {
        CycleMode::First => &FIRST_CYCLE,
        CycleMode::Steady => &STEADY_CYCLE,
    }
}

/// Attempt budgets, each exhausted independently.
#[derive(Debug, Clone, Copy)]
pub struct Budgets {
    pub poll: PollBudget,
    pub refresh: PollBudget,
    pub exchange: PollBudget,
}

impl Budgets {
    pub fn from_settings(settings: &Settings) -> Self {
        Self { poll: settings.poll, refresh: settings.refresh, exchange: settings.exchange }
    }
}

impl Default for Budgets {
    fn default() -> Self {
        Self { poll: PollBudget::STANDARD, refresh: PollBudget::REFRESH, exchange: PollBudget::EXCHANGE }
    }
}

/// The support list and the party screen take seconds to settle.
const CLASS_ICON_DELAY: f64 = 7.5;
const PARTY_DELAY: f64 = 4.5;

pub struct FarmCycle {
    lm: Landmarks,
    budgets: Budgets,
    party: PartyKind,
    map_number: u32,
    battle: Vec<BattleCommand>,
}

impl FarmCycle {
    pub fn new(lm: Landmarks, budgets: Budgets, party: PartyKind, map_number: u32, battle: Vec<BattleCommand>) -> Self {
        Self { lm, budgets, party, map_number, battle }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Landmarks::new(&settings.assets_dir),
            Budgets::from_settings(settings),
            settings.party,
            settings.map_number,
            settings.battle.clone(),
        )
    }

    /// Initial screen to the support list.
    fn navigate(&self, s: &mut Screen) -> Result<(), BotError> {
        let lm = &self.lm;
        let poll = self.budgets.poll;
        let targets = targets::farming_targets(&lm.orbit_dir)?;
        logger::info_p("cycle", &format!("{} map template(s), desired #{}", targets.len(), self.map_number));

        BoundedPoll::new("startup notice", poll)
            .until_or(s, |s| s.seen(&lm.notice), |s| s.tap(DEAD_ZONE).map(drop))?;

        let mut visited = 0usize;
        let mut scroll_reset = true;
        BoundedPoll::new("support screen", poll).until(s, |s| {
            if s.seen(&lm.support_select)? {
                return Ok(true);
            }
            match targets.get(visited) {
                Some(target) => {
                    let name = format!("map {}", target.name());
                    BoundedPoll::new(&name, poll).until(s, |s| {
                        if s.tap_if_seen(target)? {
                            s.tap_if_seen(&lm.quest_start2)?;
                            return Ok(true);
                        }
                        if self.wants_scroll(visited) {
                            self.scroll_list(s, &mut scroll_reset)?;
                        }
                        if visited == 0 {
                            s.tap(DEAD_ZONE)?;
                        }
                        Ok(false)
                    })?;
                    visited += 1;
                }
                // nothing known to tap: keep searching so an empty target
                // set still ends in a stall instead of a silent pass
                None if targets.is_empty() => {
                    self.scroll_list(s, &mut scroll_reset)?;
                    s.tap(DEAD_ZONE)?;
                }
                None => {}
            }
            Ok(false)
        })?;

        self.recover_ap(s)
    }

    /// Keep scrolling unless the next template to find is the desired one.
    fn wants_scroll(&self, visited: usize) -> bool {
        self.map_number == 0 || visited + 1 != self.map_number as usize
    }

    /// Move the quest list one notch down. The first call per cycle resets
    /// the list to its top.
    fn scroll_list(&self, s: &mut Screen, reset_pending: &mut bool) -> Result<(), BotError> {
        let lm = &self.lm;
        if s.seen(&lm.scroll)? {
            if *reset_pending {
                s.drag_if_seen(&lm.scroll, Offset::new(0, -1080), 1.5)?;
                *reset_pending = false;
            }
            s.drag_if_seen(&lm.scroll, Offset::new(0, 55), 0.3)?;
            return Ok(());
        }
        if *reset_pending {
            BoundedPoll::new("menu before list reset", self.budgets.poll).until(s, |s| s.seen(&lm.menu))?;
            for _ in 0..7 {
                s.key("f5")?;
            }
            s.drag(LIST_EDGE, Offset::new(0, 550), 1.5)?;
            *reset_pending = false;
        }
        s.drag(LIST_EDGE, Offset::new(0, -30), 0.3)?;
        Ok(())
    }

    fn select_support(&self, s: &mut Screen, session: &mut Session) -> Result<(), BotError> {
        let lm = &self.lm;
        let settle = PollBudget { delay_secs: CLASS_ICON_DELAY, ..self.budgets.poll };
        BoundedPoll::new("class icon", settle).until(s, |s| s.tap_if_seen(&lm.class_icon))?;

        let supports = session.support_targets(&lm.friend_dir)?;
        BoundedPoll::new("support list refresh", self.budgets.refresh).until_or(
            s,
            |s| {
                let mut found = false;
                BoundedPoll::new("support scan", self.budgets.poll).until(s, |s| {
                    for t in supports {
                        if s.tap_if_seen(t)? {
                            found = true;
                            return Ok(true);
                        }
                    }
                    // scroll while there is list left, otherwise this pass is over
                    if s.seen(&lm.scroll)? && !s.seen(&lm.scroll_end)? {
                        s.drag_if_seen(&lm.scroll, Offset::new(0, 55), 0.3)?;
                        return Ok(false);
                    }
                    Ok(true)
                })?;
                Ok(found)
            },
            |s| {
                logger::info_p("cycle", "no wanted support in list, refreshing");
                s.tap_if_seen(&lm.list_update)?;
                s.tap_if_seen(&lm.yes)?;
                Ok(())
            },
        )?;
        Ok(())
    }

    fn start_quest(&self, s: &mut Screen) -> Result<(), BotError> {
        let lm = &self.lm;
        let party = lm.party(self.party);
        let settle = PollBudget { delay_secs: PARTY_DELAY, ..self.budgets.poll };
        BoundedPoll::new("party preset", settle)
            .until_or(s, |s| s.seen(party), |s| s.tap_if_seen(&lm.next_party).map(drop))?;
        BoundedPoll::new("quest start", self.budgets.poll).until(s, |s| s.tap_if_seen(&lm.quest_start1))?;
        Ok(())
    }

    fn read_result(&self, s: &mut Screen) -> Result<(), BotError> {
        let lm = &self.lm;
        let sortie_ready = lm.continuous_sortie.at(0.9);
        BoundedPoll::new("battle result", self.budgets.poll).until(s, |s| {
            if s.seen(&sortie_ready)? {
                return Ok(true);
            }
            if !s.tap_if_seen(&lm.next)? {
                s.tap(DEAD_ZONE)?;
            }
            Ok(false)
        })?;
        Ok(())
    }

    fn sortie_again(&self, s: &mut Screen) -> Result<(), BotError> {
        let lm = &self.lm;
        BoundedPoll::new("continuous sortie", self.budgets.poll).until(s, |s| s.tap_if_seen(&lm.continuous_sortie))?;
        self.recover_ap(s)
    }

    /// Spend one recovery item when the AP dialog is up; no-op otherwise.
    fn recover_ap(&self, s: &mut Screen) -> Result<(), BotError> {
        let lm = &self.lm;
        if !s.seen(&lm.ap_heal)? {
            return Ok(());
        }
        logger::info_p("cycle", "AP depleted, using a recovery item");
        let mut reset_pending = true;
        BoundedPoll::new("recovery item", self.budgets.poll).until(s, |s| {
            if s.tap_if_seen(&lm.apple)? {
                return Ok(true);
            }
            if s.seen(&lm.scroll_ap)? {
                if reset_pending {
                    s.drag_if_seen(&lm.scroll_ap, Offset::new(0, -1440), 0.3)?;
                    reset_pending = false;
                }
                s.drag_if_seen(&lm.scroll_ap, Offset::new(0, 55), 0.3)?;
            }
            Ok(false)
        })?;
        BoundedPoll::new("recovery confirm", self.budgets.poll).until(s, |s| s.tap_if_seen(&lm.decide))?;
        Ok(())
    }
}

impl Cycle for FarmCycle {
    fn run_cycle(&mut self, s: &mut Screen, session: &mut Session) -> Result<(), BotError> {
        for &phase in phases(session.mode()) {
            s.check_cancel()?;
            session.enter(phase);
            match phase {
                Phase::Navigate => self.navigate(s)?,
                Phase::SupportSelect => self.select_support(s, session)?,
                Phase::QuestStart => self.start_quest(s)?,
                Phase::Combat => Combat::new(&self.lm, self.budgets.poll).run_plan(s, &self.battle)?,
                Phase::Result => self.read_result(s)?,
                Phase::ReSortie => self.sortie_again(s)?,
                Phase::Summon | Phase::BoxOpen => {
                    return Err(BotError::Config(format!("{} is not a farming phase", phase)));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    use crate::platform::script::ScriptedPlatform;
    use crate::poll::CancelToken;

    fn budget(n: u32) -> PollBudget {
        PollBudget { max_attempts: n, delay_secs: 0.1 }
    }

    fn farm(assets: &Path, map_number: u32) -> FarmCycle {
        let budgets = Budgets { poll: budget(60), refresh: budget(3), exchange: budget(600) };
        FarmCycle::new(Landmarks::new(assets), budgets, PartyKind::Orbit, map_number, Vec::new())
    }

    fn assets(maps: &[&str], supports: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("orbit")).unwrap();
        fs::create_dir_all(dir.path().join("friend")).unwrap();
        for m in maps {
            fs::write(dir.path().join("orbit").join(m), b"").unwrap();
        }
        for f in supports {
            fs::write(dir.path().join("friend").join(f), b"").unwrap();
        }
        dir
    }

    fn screen(script: &ScriptedPlatform) -> Screen {
        Screen::new(Box::new(script.clone()), CancelToken::new())
    }

    #[test]
    fn steady_mode_skips_setup_phases() {
        assert_eq!(phases(CycleMode::First).len(), 6);
        assert_eq!(phases(CycleMode::Steady), &STEADY_CYCLE);
        assert!(!phases(CycleMode::Steady).contains(&Phase::Navigate));
        assert!(!phases(CycleMode::Steady).contains(&Phase::QuestStart));
    }

    #[test]
    fn navigate_walks_targets_in_order() {
        let dir = assets(&["orbit_picture1.png", "orbit_picture2.png"], &[]);
        let script = ScriptedPlatform::new();
        script.always("notice", true);
        script.always("orbit_picture1", true);
        script.always("orbit_picture2", true);
        script.answers("support_select", [false, false]).always("support_select", true);
        let mut s = screen(&script);
        farm(dir.path(), 0).navigate(&mut s).unwrap();

        let order: Vec<String> = script
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                crate::platform::script::Call::Search(n) if n.starts_with("orbit_picture") => Some(n),
                _ => None,
            })
            .collect();
        assert_eq!(order, ["orbit_picture1", "orbit_picture2"]);
        // AP dialog checked once at the end
        assert_eq!(script.searches("ap_heal"), 1);
    }

    #[test]
    fn navigate_with_no_targets_stalls() {
        let dir = assets(&[], &[]);
        let script = ScriptedPlatform::new();
        script.always("notice", true);
        script.always("menu", true);
        let mut s = screen(&script);
        let err = farm(dir.path(), 0).navigate(&mut s).unwrap_err();
        assert!(matches!(err, BotError::Stall { ref step, attempts: 60 } if step == "support screen"));
        // the list reset happens once, then plain drags
        assert_eq!(script.keys("f5"), 7);
        assert_eq!(script.drags(), 61);
    }

    #[test]
    fn navigate_scrolls_with_bar_and_resets_once() {
        let dir = assets(&["orbit_picture1.png"], &[]);
        let script = ScriptedPlatform::new();
        script.always("notice", true);
        script.always("scroll", true);
        script.appears_after("orbit_picture1", 3);
        script.answers("support_select", [false]).always("support_select", true);
        let mut s = screen(&script);
        farm(dir.path(), 0).navigate(&mut s).unwrap();
        // one reset drag plus one notch per miss
        assert_eq!(script.drags(), 4);
        assert_eq!(script.keys("f5"), 0);
    }

    #[test]
    fn desired_map_is_not_scrolled_past() {
        let dir = assets(&["orbit_picture1.png"], &[]);
        let script = ScriptedPlatform::new();
        script.always("notice", true);
        script.always("scroll", true);
        script.appears_after("orbit_picture1", 2);
        script.answers("support_select", [false]).always("support_select", true);
        let mut s = screen(&script);
        farm(dir.path(), 1).navigate(&mut s).unwrap();
        assert_eq!(script.drags(), 0);
    }

    #[test]
    fn support_refresh_budget_is_separate_from_poll_budget() {
        let dir = assets(&[], &["friend_reisou1.png"]);
        let script = ScriptedPlatform::new();
        script.appears_after("class_icon", 5);
        let mut s = screen(&script);
        let mut session = Session::new(3, shared_status());
        let err = farm(dir.path(), 0).select_support(&mut s, &mut session).unwrap_err();
        assert!(matches!(err, BotError::Stall { ref step, attempts: 3 } if step == "support list refresh"));
        assert_eq!(script.searches("class_icon"), 6);
        assert_eq!(script.searches("list_update"), 3);
    }

    #[test]
    fn support_scrolls_until_end_before_refresh() {
        let dir = assets(&[], &["friend_reisou1.png"]);
        let script = ScriptedPlatform::new();
        script.always("class_icon", true);
        script.always("scroll", true);
        script.answers("scroll_end", [false, false]).always("scroll_end", true);
        script.answers("friend_reisou1", [false, false, false]).always("friend_reisou1", true);
        let mut s = screen(&script);
        let mut session = Session::new(3, shared_status());
        farm(dir.path(), 0).select_support(&mut s, &mut session).unwrap();
        assert_eq!(script.drags(), 2);
        assert_eq!(script.searches("list_update"), 1);
    }

    #[test]
    fn support_scan_gives_up_after_its_own_budget() {
        let dir = assets(&[], &["friend_reisou1.png"]);
        let script = ScriptedPlatform::new();
        script.always("class_icon", true);
        script.always("scroll", true);
        let mut s = screen(&script);
        let mut session = Session::new(3, shared_status());
        let err = farm(dir.path(), 0).select_support(&mut s, &mut session).unwrap_err();
        assert!(matches!(err, BotError::Stall { ref step, attempts: 60 } if step == "support scan"));
        assert_eq!(script.drags(), 60);
        assert_eq!(script.searches("list_update"), 0);
    }

    #[test]
    fn slow_screens_poll_with_longer_delays() {
        let dir = assets(&[], &[]);
        let script = ScriptedPlatform::new();
        script.appears_after("class_icon", 2);
        script.appears_after("orbit", 1);
        script.always("quest_start1", true);
        let mut s = screen(&script);
        let mut session = Session::new(3, shared_status());
        let cycle = farm(dir.path(), 0);
        let _ = cycle.select_support(&mut s, &mut session);
        cycle.start_quest(&mut s).unwrap();
        let sleeps: Vec<f64> = script
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                crate::platform::script::Call::Sleep(secs) => Some(secs),
                _ => None,
            })
            .collect();
        assert_eq!(&sleeps[..3], &[CLASS_ICON_DELAY, CLASS_ICON_DELAY, 0.1]);
        assert_eq!(sleeps.last(), Some(&PARTY_DELAY));
    }

    #[test]
    fn result_hammers_dead_zone_without_next() {
        let dir = assets(&[], &[]);
        let script = ScriptedPlatform::new();
        script.appears_after("continuous_sortie", 3);
        script.answers("next", [true]);
        let mut s = screen(&script);
        farm(dir.path(), 0).read_result(&mut s).unwrap();
        assert_eq!(script.clicks_at(DEAD_ZONE), 2);
    }

    #[test]
    fn ap_recovery_is_noop_with_ap_left() {
        let dir = assets(&[], &[]);
        let script = ScriptedPlatform::new();
        let mut s = screen(&script);
        farm(dir.path(), 0).recover_ap(&mut s).unwrap();
        assert_eq!(script.calls().len(), 1);
    }

    #[test]
    fn ap_recovery_scrolls_and_confirms() {
        let dir = assets(&[], &[]);
        let script = ScriptedPlatform::new();
        script.always("ap_heal", true);
        script.always("scroll_ap", true);
        script.appears_after("apple", 2);
        script.always("decide", true);
        let mut s = screen(&script);
        farm(dir.path(), 0).recover_ap(&mut s).unwrap();
        assert_eq!(script.drags(), 3);
        assert_eq!(script.searches("decide"), 1);
    }

    #[test]
    fn full_first_cycle_runs_every_phase() {
        let dir = assets(&["orbit_picture1.png"], &["friend_reisou1.png"]);
        let script = ScriptedPlatform::new();
        for name in [
            "notice", "orbit_picture1", "support_select", "class_icon", "friend_reisou1",
            "orbit", "quest_start1", "continuous_sortie",
        ] {
            script.always(name, true);
        }
        let mut s = screen(&script);
        let mut session = Session::new(3, shared_status());
        let mut cycle = farm(dir.path(), 0);
        cycle.run_cycle(&mut s, &mut session).unwrap();
        assert_eq!(session.phase(), Some(Phase::ReSortie));
        assert_eq!(script.searches("notice"), 1);

        script.clear_calls();
        session.complete_cycle();
        cycle.run_cycle(&mut s, &mut session).unwrap();
        assert_eq!(script.searches("notice"), 0);
        assert_eq!(script.searches("quest_start1"), 0);
    }
}
