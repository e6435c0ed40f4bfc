//! Named templates and fixed screen coordinates for the game client.
//! Confidences are tuned per landmark; 0.95 unless noted.

use std::path::{Path, PathBuf};

use crate::types::{PartyKind, Point, Template};

/// Tapped to dismiss dialogs and skip animations. Nothing lives there.
pub const DEAD_ZONE: Point = Point::new(1910, 1070);
pub const SCREEN_CENTER: Point = Point::new(950, 550);
/// Right edge of the quest list, used for raw touch scrolling.
pub const LIST_EDGE: Point = Point::new(1900, 550);
pub const EVENT_BOX_SLOT: Point = Point::new(1100, 200);
pub const EXCHANGE_HOTSPOT: Point = Point::new(530, 620);

const DEFAULT_CONFIDENCE: f64 = 0.95;

#[derive(Debug, Clone)]
pub struct Landmarks {
    pub orbit_dir: PathBuf,
    pub friend_dir: PathBuf,

    // battle
    pub attack: Template,
    pub buster: Template,
    pub arts: Template,
    pub quick: Template,
    pub master_skill: Template,
    pub order_change: Template,

    // navigation and quest
    pub notice: Template,
    pub menu: Template,
    pub support_select: Template,
    pub quest_start1: Template,
    pub quest_start2: Template,
    pub scroll: Template,
    pub scroll_end: Template,
    pub next: Template,
    pub next_party: Template,
    pub party_friend_point: Template,
    pub party_orbit: Template,
    pub party_qp: Template,
    pub continuous_sortie: Template,

    // support list
    pub class_icon: Template,
    pub list_update: Template,
    pub yes: Template,

    // AP recovery
    pub ap_heal: Template,
    pub apple: Template,
    pub scroll_ap: Template,
    pub decide: Template,

    // summon
    pub summon: Template,
    pub friend_point_summon: Template,
    pub summon_10: Template,
    pub summon_again: Template,
    pub decide_summon: Template,

    // event box
    pub event_reward: Template,
    pub event_box_reset: Template,
    pub event_run: Template,
    pub event_close: Template,

    pub client_icon: Template,
}

impl Landmarks {
    pub fn new(assets: &Path) -> Self {
        let battle = assets.join("battle");
        let orbit = assets.join("orbit");
        let friend = assets.join("friend");
        let other = assets.join("other");
        let t = |dir: &Path, name: &str| Template::new(dir.join(format!("{}.png", name)), DEFAULT_CONFIDENCE);

        Self {
            attack: t(&battle, "attack").at(0.85),
            buster: t(&battle, "buster"),
            arts: t(&battle, "arts"),
            quick: t(&battle, "quick"),
            master_skill: t(&battle, "master_skill"),
            order_change: t(&battle, "change"),

            notice: t(&other, "notice"),
            menu: t(&other, "menu"),
            support_select: t(&other, "support_select"),
            quest_start1: t(&other, "quest_start1"),
            quest_start2: t(&other, "quest_start2").at(0.9),
            scroll: t(&other, "scroll"),
            // the bar's end state differs from mid-list by a few pixels
            scroll_end: t(&other, "scroll_end").at(0.992),
            next: t(&other, "next"),
            next_party: t(&other, "next_party"),
            party_friend_point: t(&other, "friend_point"),
            party_orbit: t(&other, "orbit"),
            party_qp: t(&other, "qp"),
            continuous_sortie: t(&other, "continuous_sortie"),

            class_icon: t(&friend, "class_icon"),
            list_update: t(&other, "list_update"),
            yes: t(&other, "yes"),

            ap_heal: t(&other, "ap_heal").at(0.8),
            apple: t(&other, "apple"),
            scroll_ap: t(&other, "scroll_ap"),
            decide: t(&other, "decide").at(0.8),

            summon: t(&other, "summon"),
            friend_point_summon: t(&other, "friend_point_summon"),
            summon_10: t(&other, "summon_10_times"),
            summon_again: t(&other, "summon_10_times_in_a_row"),
            decide_summon: t(&other, "decide_summon"),

            event_reward: t(&orbit, "event_reward"),
            event_box_reset: t(&orbit, "event_box_reset"),
            event_run: t(&orbit, "event_run"),
            event_close: t(&orbit, "event_close"),

            client_icon: t(&other, "client_icon"),

            orbit_dir: orbit,
            friend_dir: friend,
        }
    }

    pub fn party(&self, kind: PartyKind) -> &Template {
        match kind {
            PartyKind::FriendPoint => &self.party_friend_point,
            PartyKind::Orbit => &self.party_orbit,
            PartyKind::Qp => &self.party_qp,
        }
    }

    pub fn templates(&self) -> Vec<&Template> {
        vec![
            &self.attack, &self.buster, &self.arts, &self.quick, &self.master_skill, &self.order_change,
            &self.notice, &self.menu, &self.support_select, &self.quest_start1, &self.quest_start2,
            &self.scroll, &self.scroll_end, &self.next, &self.next_party,
            &self.party_friend_point, &self.party_orbit, &self.party_qp, &self.continuous_sortie,
            &self.class_icon, &self.list_update, &self.yes,
            &self.ap_heal, &self.apple, &self.scroll_ap, &self.decide,
            &self.summon, &self.friend_point_summon, &self.summon_10, &self.summon_again, &self.decide_summon,
            &self.event_reward, &self.event_box_reset, &self.event_run, &self.event_close,
            &self.client_icon,
        ]
    }

    /// Templates whose image file does not exist.
    pub fn missing(&self) -> Vec<&Template> {
        self.templates().into_iter().filter(|t| !t.path.is_file()).collect()
    }
}
