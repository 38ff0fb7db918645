//! The narrow surface the agent uses to observe and act on the game.
//!
//! Queries never fail: a value that cannot be determined comes back as
//! `None` (or an `Unknown` variant) and the caller treats it as "nothing to do
//! this tick". Actions are fire-and-forget.

use crate::types::{Item, Skill, WorldPoint};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Scene objects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    BankChest,
    BrumaRoots,
    HerbRoots,
    Brazier,
    BurningBrazier,
    BrokenBrazier,
    TinderboxCrate,
    KnifeCrate,
    HammerCrate,
    AxeCrate,
    VialCrate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneObject {
    pub kind: ObjectKind,
    pub position: WorldPoint,
}

/// How to interact with a scene object: by menu index or by verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectAction {
    Index(u8),
    Verb(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    Warmth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickRegion {
    Object(WorldPoint),
    SideMenu,
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

pub trait Game {
    // Queries

    fn tick_count(&self) -> u64;
    fn widget_text(&self, widget: Widget) -> Option<String>;
    /// Ticks until the next round starts; 0 while a round is in progress.
    fn round_timer(&self) -> u32;
    fn inventory_count(&self, item: Item) -> u32;
    /// Inventory items whose name contains `fragment`, case-insensitive, in
    /// slot order.
    fn inventory_matching(&self, fragment: &str) -> Vec<Item>;
    fn bank_is_open(&self) -> bool;
    fn bank_contains(&self, item: Item) -> bool;
    fn experience(&self, skill: Skill) -> u32;
    fn level(&self, skill: Skill) -> u32;
    /// Nearest object of `kind` to `near`, or to the player when `near` is `None`.
    fn nearest_object(&self, kind: ObjectKind, near: Option<WorldPoint>) -> Option<SceneObject>;
    fn is_moving(&self) -> bool;
    fn is_idle(&self) -> bool;
    fn player_position(&self) -> WorldPoint;

    fn inventory_contains(&self, item: Item) -> bool {
        self.inventory_count(item) > 0
    }

    fn inventory_count_any(&self, items: &[Item]) -> u32 {
        items.iter().map(|&i| self.inventory_count(i)).sum()
    }

    // Actions

    fn interact_object(&mut self, object: &SceneObject, action: ObjectAction);
    fn interact_item(&mut self, item: Item, action: u8);
    fn use_item_on(&mut self, item: Item, target: Item);
    fn walk_to(&mut self, point: WorldPoint);
    fn deposit_inventory(&mut self);
    fn withdraw(&mut self, item: Item, quantity: u32);
    fn queue_click(&mut self, region: ClickRegion);
}

// ---------------------------------------------------------------------------
// BrazierState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrazierState {
    Lit,
    Unlit,
    Broken,
    Unknown,
}

impl BrazierState {
    fn kind(self) -> Option<ObjectKind> {
        match self {
            BrazierState::Lit => Some(ObjectKind::BurningBrazier),
            BrazierState::Unlit => Some(ObjectKind::Brazier),
            BrazierState::Broken => Some(ObjectKind::BrokenBrazier),
            BrazierState::Unknown => None,
        }
    }

    pub fn verb(self) -> Option<&'static str> {
        match self {
            BrazierState::Lit => Some("Feed"),
            BrazierState::Unlit => Some("Light"),
            BrazierState::Broken => Some("Fix"),
            BrazierState::Unknown => None,
        }
    }

    /// State of the brazier standing at `at`.
    pub fn observe<W: Game + ?Sized>(world: &W, at: WorldPoint) -> BrazierState {
        for state in [BrazierState::Lit, BrazierState::Unlit, BrazierState::Broken] {
            let Some(kind) = state.kind() else { continue };
            if let Some(object) = world.nearest_object(kind, Some(at)) {
                if object.position.distance(at) <= 1 {
                    return state;
                }
            }
        }
        BrazierState::Unknown
    }

    /// Click the brazier at `at` with the verb that fits its state.
    /// Does nothing for `Unknown`.
    pub fn interact<W: Game + ?Sized>(self, world: &mut W, at: WorldPoint) {
        let (Some(kind), Some(verb)) = (self.kind(), self.verb()) else {
            return;
        };
        if let Some(object) = world.nearest_object(kind, Some(at)) {
            world.queue_click(ClickRegion::Object(object.position));
            world.interact_object(&object, ObjectAction::Verb(verb));
        }
    }
}
