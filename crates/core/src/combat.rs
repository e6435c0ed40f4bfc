//! Battle commands and their coordinate tables. Slots are 1-based as the
//! player counts them and are checked against the table before lookup.

use serde::{Deserialize, Serialize};

use crate::error::BotError;
use crate::landmarks::{Landmarks, DEAD_ZONE};
use crate::logger;
use crate::poll::BoundedPoll;
use crate::probe::Screen;
use crate::types::{PollBudget, Point};

const fn p(x: i32, y: i32) -> Point {
    Point::new(x, y)
}

/// Three skills per servant, servants left to right.
const SKILL_XY: [Point; 9] = [
    p(110, 870), p(245, 870), p(380, 870),
    p(585, 870), p(720, 870), p(855, 870),
    p(1060, 870), p(1195, 870), p(1330, 870),
];
const ALLY_3_XY: [Point; 3] = [p(490, 650), p(960, 650), p(1430, 650)];
/// Front line then back line, used by order change.
const ALLY_6_XY: [Point; 6] = [p(205, 520), p(505, 520), p(805, 520), p(1105, 520), p(1405, 520), p(1705, 520)];
const MASTER_SKILL_XY: [Point; 3] = [p(1360, 465), p(1495, 465), p(1630, 465)];
const NOBLE_PHANTASM_XY: [Point; 3] = [p(620, 300), p(970, 300), p(1320, 300)];
/// Counted from the top right.
const ENEMY_3_XY: [Point; 3] = [p(815, 65), p(440, 65), p(65, 65)];
const ENEMY_6_XY: [Point; 6] = [p(810, 50), p(510, 50), p(210, 50), p(665, 195), p(365, 195), p(65, 195)];

const SKILLS_PER_SERVANT: u32 = 3;
const CARDS_PER_COLOR: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BattleCommand {
    /// Self or party-wide skill.
    Skill { servant: u32, skill: u32 },
    /// Skill with a single ally target.
    SkillOn { servant: u32, skill: u32, target: u32 },
    MasterSkill { skill: u32 },
    MasterSkillOn { skill: u32, target: u32 },
    /// Swap `first` (front line) with `second` (back line) via a master skill.
    OrderChange { skill: u32, first: u32, second: u32 },
    Enemy { slot: u32 },
    EnemyWide { slot: u32 },
    /// Tap `cards` command cards, preferring buster, then arts, then quick.
    Attack { cards: u32, #[serde(default)] first: bool },
    NoblePhantasm { servants: Vec<u32>, #[serde(default)] first: bool },
}

fn slot(table: &[Point], n: u32, what: &str) -> Result<Point, BotError> {
    if n == 0 || n as usize > table.len() {
        return Err(BotError::Config(format!("{} slot {} outside 1..={}", what, n, table.len())));
    }
    Ok(table[n as usize - 1])
}

fn skill_slot(servant: u32, skill: u32) -> Result<Point, BotError> {
    if !(1..=SKILLS_PER_SERVANT).contains(&skill) {
        return Err(BotError::Config(format!("skill {} outside 1..={}", skill, SKILLS_PER_SERVANT)));
    }
    let servants = SKILL_XY.len() as u32 / SKILLS_PER_SERVANT;
    if !(1..=servants).contains(&servant) {
        return Err(BotError::Config(format!("servant {} outside 1..={}", servant, servants)));
    }
    slot(&SKILL_XY, (servant - 1) * SKILLS_PER_SERVANT + skill, "skill")
}

impl BattleCommand {
    /// Resolve every coordinate the command would touch.
    pub fn validate(&self) -> Result<(), BotError> {
        match self {
            BattleCommand::Skill { servant, skill } => skill_slot(*servant, *skill).map(drop),
            BattleCommand::SkillOn { servant, skill, target } => {
                skill_slot(*servant, *skill)?;
                slot(&ALLY_3_XY, *target, "ally").map(drop)
            }
            BattleCommand::MasterSkill { skill } => slot(&MASTER_SKILL_XY, *skill, "master skill").map(drop),
            BattleCommand::MasterSkillOn { skill, target } => {
                slot(&MASTER_SKILL_XY, *skill, "master skill")?;
                slot(&ALLY_3_XY, *target, "ally").map(drop)
            }
            BattleCommand::OrderChange { skill, first, second } => {
                slot(&MASTER_SKILL_XY, *skill, "master skill")?;
                slot(&ALLY_6_XY, *first, "order change")?;
                slot(&ALLY_6_XY, *second, "order change").map(drop)
            }
            BattleCommand::Enemy { slot: n } => slot(&ENEMY_3_XY, *n, "enemy").map(drop),
            BattleCommand::EnemyWide { slot: n } => slot(&ENEMY_6_XY, *n, "enemy").map(drop),
            BattleCommand::Attack { .. } => Ok(()),
            BattleCommand::NoblePhantasm { servants, .. } => {
                if servants.is_empty() {
                    return Err(BotError::Config("noble phantasm needs at least one servant".into()));
                }
                servants.iter().try_for_each(|n| slot(&NOBLE_PHANTASM_XY, *n, "noble phantasm").map(drop))
            }
        }
    }
}

/// Runs battle commands against the screen.
pub struct Combat<'a> {
    lm: &'a Landmarks,
    budget: PollBudget,
}

impl<'a> Combat<'a> {
    pub fn new(lm: &'a Landmarks, budget: PollBudget) -> Self {
        Self { lm, budget }
    }

    pub fn run_plan(&self, s: &mut Screen, plan: &[BattleCommand]) -> Result<(), BotError> {
        if plan.is_empty() {
            logger::warn_p("combat", "battle plan is empty");
        }
        for (i, cmd) in plan.iter().enumerate() {
            s.check_cancel()?;
            logger::info_p("combat", &format!("step {}: {:?}", i + 1, cmd));
            self.execute(s, cmd)?;
        }
        Ok(())
    }

    /// Wait for the command phase; `press` also taps the attack button.
    fn await_command_phase(&self, s: &mut Screen, press: bool) -> Result<(), BotError> {
        let attack = &self.lm.attack;
        BoundedPoll::new("attack button", self.budget)
            .until_or(s, |s| if press { s.tap_if_seen(attack) } else { s.seen(attack) }, |s| {
                s.tap(DEAD_ZONE).map(drop)
            })
            .map(drop)
    }

    pub fn execute(&self, s: &mut Screen, cmd: &BattleCommand) -> Result<(), BotError> {
        match cmd {
            BattleCommand::Skill { servant, skill } => {
                let at = skill_slot(*servant, *skill)?;
                self.await_command_phase(s, false)?;
                s.tap(at)?;
            }
            BattleCommand::SkillOn { servant, skill, target } => {
                let at = skill_slot(*servant, *skill)?;
                let on = slot(&ALLY_3_XY, *target, "ally")?;
                self.await_command_phase(s, false)?;
                s.tap(at)?;
                s.tap(on)?;
            }
            BattleCommand::MasterSkill { skill } => {
                let at = slot(&MASTER_SKILL_XY, *skill, "master skill")?;
                self.await_command_phase(s, false)?;
                s.tap_if_seen(&self.lm.master_skill)?;
                s.tap(at)?;
            }
            BattleCommand::MasterSkillOn { skill, target } => {
                let at = slot(&MASTER_SKILL_XY, *skill, "master skill")?;
                let on = slot(&ALLY_3_XY, *target, "ally")?;
                self.await_command_phase(s, false)?;
                s.tap_if_seen(&self.lm.master_skill)?;
                s.tap(at)?;
                s.tap(on)?;
            }
            BattleCommand::OrderChange { skill, first, second } => {
                let at = slot(&MASTER_SKILL_XY, *skill, "master skill")?;
                let a = slot(&ALLY_6_XY, *first, "order change")?;
                let b = slot(&ALLY_6_XY, *second, "order change")?;
                self.await_command_phase(s, false)?;
                s.tap_if_seen(&self.lm.master_skill)?;
                s.tap(at)?;
                s.tap(a)?;
                s.tap(b)?;
                s.tap_if_seen(&self.lm.order_change)?;
            }
            BattleCommand::Enemy { slot: n } => {
                let at = slot(&ENEMY_3_XY, *n, "enemy")?;
                self.await_command_phase(s, false)?;
                s.tap(at)?;
            }
            BattleCommand::EnemyWide { slot: n } => {
                let at = slot(&ENEMY_6_XY, *n, "enemy")?;
                self.await_command_phase(s, false)?;
                s.tap(at)?;
            }
            BattleCommand::Attack { cards, first } => {
                if *first {
                    self.await_command_phase(s, true)?;
                }
                self.pick_cards(s, *cards)?;
            }
            BattleCommand::NoblePhantasm { servants, first } => {
                let spots = servants
                    .iter()
                    .map(|n| slot(&NOBLE_PHANTASM_XY, *n, "noble phantasm"))
                    .collect::<Result<Vec<_>, _>>()?;
                if *first {
                    self.await_command_phase(s, true)?;
                }
                let mut done = vec![false; spots.len()];
                BoundedPoll::new("noble phantasm", self.budget).until(s, |s| {
                    for (i, at) in spots.iter().enumerate() {
                        if !done[i] && s.tap(*at)? {
                            done[i] = true;
                        }
                    }
                    Ok(done.iter().all(|d| *d))
                })?;
            }
        }
        Ok(())
    }

    /// Up to three probes per card color; stops once `cards` are tapped.
    fn pick_cards(&self, s: &mut Screen, cards: u32) -> Result<u32, BotError> {
        let mut tapped = 0;
        for color in [&self.lm.buster, &self.lm.arts, &self.lm.quick] {
            for _ in 0..CARDS_PER_COLOR {
                if tapped >= cards {
                    return Ok(tapped);
                }
                if s.tap_if_seen(color)? {
                    tapped += 1;
                }
            }
        }
        if tapped < cards {
            logger::warn_p("combat", &format!("only {} of {} cards found", tapped, cards));
        }
        Ok(tapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::platform::script::ScriptedPlatform;
    use crate::poll::CancelToken;

    fn setup() -> (ScriptedPlatform, Screen, Landmarks) {
        let script = ScriptedPlatform::new();
        let screen = Screen::new(Box::new(script.clone()), CancelToken::new());
        (script, screen, Landmarks::new(Path::new("assets")))
    }

    #[test]
    fn skill_index_is_servant_major() {
        assert_eq!(skill_slot(1, 1).unwrap(), p(110, 870));
        assert_eq!(skill_slot(2, 3).unwrap(), p(855, 870));
        assert_eq!(skill_slot(3, 3).unwrap(), p(1330, 870));
        assert!(skill_slot(4, 1).is_err());
        assert!(skill_slot(1, 4).is_err());
        assert!(skill_slot(0, 1).is_err());
    }

    #[test]
    fn slot_zero_and_overflow_are_rejected() {
        assert!(BattleCommand::Enemy { slot: 0 }.validate().is_err());
        assert!(BattleCommand::EnemyWide { slot: 6 }.validate().is_ok());
        assert!(BattleCommand::EnemyWide { slot: 7 }.validate().is_err());
        assert!(BattleCommand::NoblePhantasm { servants: vec![], first: false }.validate().is_err());
    }

    #[test]
    fn plan_parses_from_json() {
        let plan: Vec<BattleCommand> = serde_json::from_str(
            r#"[{"op":"skill_on","servant":1,"skill":2,"target":3},{"op":"attack","cards":2,"first":true}]"#,
        )
        .unwrap();
        assert_eq!(plan[0], BattleCommand::SkillOn { servant: 1, skill: 2, target: 3 });
        assert_eq!(plan[1], BattleCommand::Attack { cards: 2, first: true });
    }

    #[test]
    fn skill_waits_for_command_phase() {
        let (script, mut s, lm) = setup();
        script.appears_after("attack", 2);
        let combat = Combat::new(&lm, PollBudget::STANDARD);
        combat.execute(&mut s, &BattleCommand::SkillOn { servant: 2, skill: 1, target: 3 }).unwrap();
        assert_eq!(script.clicks_at(DEAD_ZONE), 2);
        assert_eq!(script.clicks_at(p(585, 870)), 1);
        assert_eq!(script.clicks_at(p(1430, 650)), 1);
    }

    #[test]
    fn bad_slot_fails_before_touching_screen() {
        let (script, mut s, lm) = setup();
        let combat = Combat::new(&lm, PollBudget::STANDARD);
        let err = combat.execute(&mut s, &BattleCommand::MasterSkill { skill: 4 }).unwrap_err();
        assert!(matches!(err, BotError::Config(_)));
        assert!(script.calls().is_empty());
    }

    #[test]
    fn attack_prefers_buster_then_arts() {
        let (script, mut s, lm) = setup();
        script.always("attack", true);
        script.answers("buster", [true, false, false]);
        script.always("arts", true);
        let combat = Combat::new(&lm, PollBudget::STANDARD);
        combat.execute(&mut s, &BattleCommand::Attack { cards: 3, first: true }).unwrap();
        assert_eq!(script.searches("buster"), 3);
        assert_eq!(script.searches("arts"), 2);
        assert_eq!(script.searches("quick"), 0);
    }

    #[test]
    fn command_phase_stall_names_attack_button() {
        let (_script, mut s, lm) = setup();
        let combat = Combat::new(&lm, PollBudget { max_attempts: 4, delay_secs: 0.0 });
        let err = combat.execute(&mut s, &BattleCommand::Enemy { slot: 1 }).unwrap_err();
        assert!(matches!(err, BotError::Stall { ref step, attempts: 4 } if step == "attack button"));
    }
}
