//! A deterministic stand-in for the game client.
//!
//! `SimWorld` implements [`Game`] over a small model of the arena: rounds
//! and intermissions, walking, the gathering and crafting activities, and
//! braziers that go out or break. Everything random draws from one seeded
//! `StdRng`, so a given seed and call sequence always plays out the same.

use crate::config::Config;
use crate::game::{BrazierState, ClickRegion, Game, ObjectAction, ObjectKind, SceneObject, Widget};
use crate::types::{Item, Skill, WorldPoint, AXES};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

const INVENTORY_SLOTS: u32 = 28;
const WALK_SPEED: i32 = 2;
/// Tiles from an object within which it can be used.
const REACH: u32 = 2;
/// Tiles from the bank chest that count as outside the arena.
const BANK_AREA: u32 = 12;
const POTION_WARMTH: u32 = 40;

// ---------------------------------------------------------------------------
// SimSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SimSettings {
    pub seed: u64,
    pub woodcutting_level: u32,
    pub firemaking_level: u32,
    pub fletching_level: u32,
    /// Length of one round, in ticks.
    pub round_ticks: u32,
    /// Ticks between rounds.
    pub intermission_ticks: u32,
    /// Ticks left in the round already running when the world is created.
    pub opening_round_ticks: u32,
    /// Ticks per point of warmth lost while in the arena during a round.
    pub warmth_drain_ticks: u64,
    /// Per-tick chance that a lit brazier breaks.
    pub brazier_break_chance: f64,
    /// Per-tick chance that a lit brazier goes out.
    pub brazier_douse_chance: f64,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            woodcutting_level: 50,
            firemaking_level: 50,
            fletching_level: 50,
            round_ticks: 300,
            intermission_ticks: 100,
            opening_round_ticks: 20,
            warmth_drain_ticks: 5,
            brazier_break_chance: 0.004,
            brazier_douse_chance: 0.004,
        }
    }
}

// ---------------------------------------------------------------------------
// SimStats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimStats {
    pub rounds_completed: u32,
    pub roots_chopped: u32,
    pub kindling_fletched: u32,
    pub fuel_fed: u32,
    pub herbs_picked: u32,
    pub potions_mixed: u32,
    pub doses_drunk: u32,
    pub braziers_lit: u32,
    pub braziers_fixed: u32,
    pub braziers_broken: u32,
    pub braziers_doused: u32,
    pub crates_looted: u32,
    pub clicks: u32,
    pub frozen_ticks: u32,
}

// ---------------------------------------------------------------------------
// SimWorld
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activity {
    Chopping,
    PickingHerbs,
    Fletching,
    Feeding(WorldPoint),
}

#[derive(Debug, Clone)]
struct SimBrazier {
    position: WorldPoint,
    state: BrazierState,
}

pub struct SimWorld {
    settings: SimSettings,
    rng: StdRng,
    tick: u64,
    player: WorldPoint,
    destination: Option<WorldPoint>,
    /// Object interaction waiting for the player to come within reach.
    pending: Option<(SceneObject, ObjectAction)>,
    activity: Option<Activity>,
    inventory: BTreeMap<Item, u32>,
    bank: BTreeMap<Item, u32>,
    bank_open: bool,
    xp: BTreeMap<Skill, u32>,
    warmth: u32,
    /// Ticks until the next round; 0 while a round is running.
    round_timer: u32,
    round_remaining: u32,
    objects: Vec<SceneObject>,
    braziers: Vec<SimBrazier>,
    stats: SimStats,
}

impl SimWorld {
    /// A world laid out from the default configuration.
    pub fn new(settings: SimSettings) -> Self {
        Self::from_config(settings, &Config::default())
    }

    /// A world whose waiting area and sites come from `config`. Each distinct
    /// site bank gets a chest.
    ///
    /// The player starts at the waiting area mid-round, holding nothing,
    /// with a rune axe, a bronze axe and a knife in the bank.
    pub fn from_config(settings: SimSettings, config: &Config) -> Self {
        let wait = config.waiting_area;
        let offset = |dx: i32, dy: i32| WorldPoint::new(wait.x + dx, wait.y + dy, wait.plane);

        let mut objects = vec![
            SceneObject {
                kind: ObjectKind::TinderboxCrate,
                position: offset(-3, 2),
            },
            SceneObject {
                kind: ObjectKind::KnifeCrate,
                position: offset(3, 2),
            },
            SceneObject {
                kind: ObjectKind::HammerCrate,
                position: offset(-3, -2),
            },
            SceneObject {
                kind: ObjectKind::AxeCrate,
                position: offset(3, -2),
            },
            SceneObject {
                kind: ObjectKind::VialCrate,
                position: offset(0, 3),
            },
        ];
        let mut braziers = Vec::new();
        for site in &config.sites {
            let chest_placed = objects
                .iter()
                .any(|o| o.kind == ObjectKind::BankChest && o.position == site.bank);
            if !chest_placed {
                objects.push(SceneObject {
                    kind: ObjectKind::BankChest,
                    position: site.bank,
                });
            }
            objects.push(SceneObject {
                kind: ObjectKind::BrumaRoots,
                position: site.roots,
            });
            objects.push(SceneObject {
                kind: ObjectKind::HerbRoots,
                position: site.herb_roots,
            });
            braziers.push(SimBrazier {
                position: site.brazier,
                state: BrazierState::Unlit,
            });
        }

        let mut bank = BTreeMap::new();
        bank.insert(Item::RuneAxe, 1);
        bank.insert(Item::BronzeAxe, 1);
        bank.insert(Item::Knife, 1);

        Self {
            rng: StdRng::seed_from_u64(settings.seed),
            tick: 0,
            player: wait,
            destination: None,
            pending: None,
            activity: None,
            inventory: BTreeMap::new(),
            bank,
            bank_open: false,
            xp: Skill::all().iter().map(|&s| (s, 0)).collect(),
            warmth: 100,
            round_timer: 0,
            round_remaining: settings.opening_round_ticks,
            objects,
            braziers,
            stats: SimStats::default(),
            settings,
        }
    }

    // -----------------------------------------------------------------------
    // Test and driver hooks
    // -----------------------------------------------------------------------

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn settings(&self) -> &SimSettings {
        &self.settings
    }

    pub fn warmth_level(&self) -> u32 {
        self.warmth
    }

    pub fn set_warmth(&mut self, warmth: u32) {
        self.warmth = warmth.min(100);
    }

    pub fn give(&mut self, item: Item, quantity: u32) {
        *self.inventory.entry(item).or_insert(0) += quantity;
    }

    pub fn stock_bank(&mut self, items: &[Item]) {
        for &item in items {
            *self.bank.entry(item).or_insert(0) += 1;
        }
    }

    pub fn clear_bank(&mut self) {
        self.bank.clear();
    }

    pub fn teleport(&mut self, point: WorldPoint) {
        self.player = point;
        self.destination = None;
    }

    pub fn brazier_state(&self, at: WorldPoint) -> BrazierState {
        self.braziers
            .iter()
            .find(|b| b.position == at)
            .map(|b| b.state)
            .unwrap_or(BrazierState::Unknown)
    }

    pub fn set_brazier_state(&mut self, at: WorldPoint, state: BrazierState) {
        if let Some(brazier) = self.braziers.iter_mut().find(|b| b.position == at) {
            brazier.state = state;
        }
    }

    /// Jump straight to the end of the current round or intermission.
    pub fn skip_to_next_period(&mut self) {
        if self.round_timer == 0 {
            self.round_remaining = 1;
        } else {
            self.round_timer = 1;
        }
        self.advance_clock();
    }

    pub fn in_round(&self) -> bool {
        self.round_timer == 0
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Move the world forward one tick.
    pub fn advance(&mut self) {
        self.tick += 1;
        self.advance_movement();
        self.resolve_pending();
        self.advance_activity();
        self.advance_clock();
        self.advance_warmth();
        self.advance_braziers();
    }

    pub fn advance_n(&mut self, n: u64) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn advance_movement(&mut self) {
        if let Some(target) = self.destination {
            self.player = self.player.step_toward(target, WALK_SPEED);
            if self.player == target {
                self.destination = None;
            }
        }
    }

    fn resolve_pending(&mut self) {
        let Some((object, _)) = &self.pending else {
            return;
        };
        if self.player.distance(object.position) > REACH {
            if self.destination.is_none() {
                self.destination = Some(object.position);
            }
            return;
        }
        if let Some((object, action)) = self.pending.take() {
            self.destination = None;
            self.apply_interaction(&object, action);
        }
    }

    fn advance_activity(&mut self) {
        let Some(activity) = self.activity else {
            return;
        };
        let keep_going = match activity {
            Activity::Chopping => self.chop(),
            Activity::PickingHerbs => self.pick_herb(),
            Activity::Fletching => self.fletch(),
            Activity::Feeding(at) => self.feed(at),
        };
        if !keep_going {
            self.activity = None;
        }
    }

    fn chop(&mut self) -> bool {
        if self.free_slots() == 0 || !self.holds_axe() {
            return false;
        }
        if self.rng.gen_bool(0.4) {
            self.give(Item::BrumaRoot, 1);
            self.gain_xp(Skill::Woodcutting, 10);
            self.stats.roots_chopped += 1;
        }
        true
    }

    fn pick_herb(&mut self) -> bool {
        if self.free_slots() == 0 {
            return false;
        }
        if self.rng.gen_bool(0.5) {
            self.give(Item::BrumaHerb, 1);
            self.stats.herbs_picked += 1;
        }
        true
    }

    fn fletch(&mut self) -> bool {
        if !self.inventory_contains(Item::Knife) || !self.inventory_contains(Item::BrumaRoot) {
            return false;
        }
        if self.rng.gen_bool(0.6) {
            self.take(Item::BrumaRoot, 1);
            self.give(Item::BrumaKindling, 1);
            self.gain_xp(Skill::Fletching, 6);
            self.stats.kindling_fletched += 1;
        }
        true
    }

    fn feed(&mut self, at: WorldPoint) -> bool {
        if !self.in_round()
            || self.brazier_state(at) != BrazierState::Lit
            || self.player.distance(at) > REACH
        {
            return false;
        }
        let fuel = if self.inventory_contains(Item::BrumaKindling) {
            Item::BrumaKindling
        } else if self.inventory_contains(Item::BrumaRoot) {
            Item::BrumaRoot
        } else {
            return false;
        };
        if self.rng.gen_bool(0.7) {
            self.take(fuel, 1);
            let xp = if fuel == Item::BrumaKindling { 40 } else { 25 };
            self.gain_xp(Skill::Firemaking, xp);
            self.stats.fuel_fed += 1;
        }
        true
    }

    fn advance_clock(&mut self) {
        if self.round_timer == 0 {
            self.round_remaining = self.round_remaining.saturating_sub(1);
            if self.round_remaining == 0 {
                self.round_timer = self.settings.intermission_ticks.max(1);
                self.stats.rounds_completed += 1;
                for brazier in &mut self.braziers {
                    brazier.state = BrazierState::Unlit;
                }
                if matches!(self.activity, Some(Activity::Feeding(_))) {
                    self.activity = None;
                }
                debug!(tick = self.tick, "sim: round over");
            }
        } else {
            self.round_timer -= 1;
            if self.round_timer == 0 {
                self.round_remaining = self.settings.round_ticks.max(1);
                debug!(tick = self.tick, "sim: round started");
            }
        }
    }

    fn advance_warmth(&mut self) {
        if !self.in_round() || self.outside_arena() {
            return;
        }
        let every = self.settings.warmth_drain_ticks.max(1);
        if self.tick % every == 0 {
            self.warmth = self.warmth.saturating_sub(1);
        }
        if self.warmth == 0 {
            self.stats.frozen_ticks += 1;
        }
    }

    fn advance_braziers(&mut self) {
        if !self.in_round() {
            return;
        }
        let (break_chance, douse_chance) = (
            self.settings.brazier_break_chance,
            self.settings.brazier_douse_chance,
        );
        for brazier in &mut self.braziers {
            if brazier.state != BrazierState::Lit {
                continue;
            }
            if self.rng.gen_bool(break_chance) {
                brazier.state = BrazierState::Broken;
                self.stats.braziers_broken += 1;
            } else if self.rng.gen_bool(douse_chance) {
                brazier.state = BrazierState::Unlit;
                self.stats.braziers_doused += 1;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Interactions
    // -----------------------------------------------------------------------

    fn apply_interaction(&mut self, object: &SceneObject, action: ObjectAction) {
        match (object.kind, action) {
            (ObjectKind::BankChest, _) => self.bank_open = true,
            (ObjectKind::BrumaRoots, _) => self.activity = Some(Activity::Chopping),
            (ObjectKind::HerbRoots, _) => self.activity = Some(Activity::PickingHerbs),
            (ObjectKind::TinderboxCrate, ObjectAction::Index(0)) => self.loot(Item::Tinderbox),
            (ObjectKind::KnifeCrate, ObjectAction::Index(0)) => self.loot(Item::Knife),
            (ObjectKind::HammerCrate, ObjectAction::Index(0)) => self.loot(Item::Hammer),
            (ObjectKind::AxeCrate, ObjectAction::Index(0)) => self.loot(Item::BronzeAxe),
            (ObjectKind::VialCrate, ObjectAction::Index(1)) => self.loot(Item::UnfinishedPotion),
            (ObjectKind::Brazier, ObjectAction::Verb("Light")) => self.light(object.position),
            (ObjectKind::BrokenBrazier, ObjectAction::Verb("Fix")) => self.fix(object.position),
            (ObjectKind::BurningBrazier, ObjectAction::Verb("Feed")) => {
                self.activity = Some(Activity::Feeding(object.position));
            }
            (kind, action) => debug!(?kind, ?action, "sim: interaction has no effect"),
        }
    }

    fn loot(&mut self, item: Item) {
        if self.free_slots() > 0 {
            self.give(item, 1);
            self.stats.crates_looted += 1;
        }
    }

    fn light(&mut self, at: WorldPoint) {
        if self.in_round() && self.inventory_contains(Item::Tinderbox) {
            self.set_brazier_state(at, BrazierState::Lit);
            self.gain_xp(Skill::Firemaking, 30);
            self.stats.braziers_lit += 1;
        }
    }

    fn fix(&mut self, at: WorldPoint) {
        if self.inventory_contains(Item::Hammer) {
            self.set_brazier_state(at, BrazierState::Unlit);
            self.stats.braziers_fixed += 1;
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn take(&mut self, item: Item, quantity: u32) -> u32 {
        let Some(held) = self.inventory.get_mut(&item) else {
            return 0;
        };
        let taken = quantity.min(*held);
        *held -= taken;
        if *held == 0 {
            self.inventory.remove(&item);
        }
        taken
    }

    fn free_slots(&self) -> u32 {
        INVENTORY_SLOTS.saturating_sub(self.inventory.values().sum())
    }

    fn holds_axe(&self) -> bool {
        AXES.iter().any(|(axe, _)| self.inventory_contains(*axe))
    }

    fn gain_xp(&mut self, skill: Skill, amount: u32) {
        *self.xp.entry(skill).or_insert(0) += amount;
    }

    fn outside_arena(&self) -> bool {
        self.objects
            .iter()
            .filter(|o| o.kind == ObjectKind::BankChest)
            .any(|o| o.position.distance(self.player) <= BANK_AREA)
    }

    fn brazier_kind(state: BrazierState) -> Option<ObjectKind> {
        match state {
            BrazierState::Lit => Some(ObjectKind::BurningBrazier),
            BrazierState::Unlit => Some(ObjectKind::Brazier),
            BrazierState::Broken => Some(ObjectKind::BrokenBrazier),
            BrazierState::Unknown => None,
        }
    }
}

impl Game for SimWorld {
    fn tick_count(&self) -> u64 {
        self.tick
    }

    fn widget_text(&self, widget: Widget) -> Option<String> {
        match widget {
            Widget::Warmth if self.outside_arena() => None,
            Widget::Warmth => Some(format!("Warmth: {}%", self.warmth)),
        }
    }

    fn round_timer(&self) -> u32 {
        self.round_timer
    }

    fn inventory_count(&self, item: Item) -> u32 {
        self.inventory.get(&item).copied().unwrap_or(0)
    }

    fn inventory_matching(&self, fragment: &str) -> Vec<Item> {
        let needle = fragment.to_lowercase();
        self.inventory
            .keys()
            .filter(|item| item.name().to_lowercase().contains(&needle))
            .copied()
            .collect()
    }

    fn bank_is_open(&self) -> bool {
        self.bank_open
    }

    fn bank_contains(&self, item: Item) -> bool {
        self.bank.get(&item).is_some_and(|&n| n > 0)
    }

    fn experience(&self, skill: Skill) -> u32 {
        self.xp.get(&skill).copied().unwrap_or(0)
    }

    fn level(&self, skill: Skill) -> u32 {
        match skill {
            Skill::Woodcutting => self.settings.woodcutting_level,
            Skill::Firemaking => self.settings.firemaking_level,
            Skill::Fletching => self.settings.fletching_level,
        }
    }

    fn nearest_object(&self, kind: ObjectKind, near: Option<WorldPoint>) -> Option<SceneObject> {
        let origin = near.unwrap_or(self.player);
        let braziers = self.braziers.iter().filter_map(|b| {
            (Self::brazier_kind(b.state) == Some(kind)).then(|| SceneObject {
                kind,
                position: b.position,
            })
        });
        self.objects
            .iter()
            .filter(|o| o.kind == kind)
            .cloned()
            .chain(braziers)
            .min_by_key(|o| o.position.distance(origin))
    }

    fn is_moving(&self) -> bool {
        self.destination.is_some()
    }

    fn is_idle(&self) -> bool {
        self.destination.is_none() && self.activity.is_none() && self.pending.is_none()
    }

    fn player_position(&self) -> WorldPoint {
        self.player
    }

    fn interact_object(&mut self, object: &SceneObject, action: ObjectAction) {
        self.activity = None;
        if self.player.distance(object.position) <= REACH {
            self.destination = None;
            self.pending = None;
            self.apply_interaction(object, action);
        } else {
            self.destination = Some(object.position);
            self.pending = Some((object.clone(), action));
        }
    }

    fn interact_item(&mut self, item: Item, action: u8) {
        if action != 2 || !item.is_potion() || self.take(item, 1) == 0 {
            return;
        }
        if let Some(rest) = item.after_dose() {
            self.give(rest, 1);
        }
        self.warmth = (self.warmth + POTION_WARMTH).min(100);
        self.stats.doses_drunk += 1;
    }

    fn use_item_on(&mut self, item: Item, target: Item) {
        match (item, target) {
            (Item::Knife, Item::BrumaRoot) if self.inventory_contains(Item::Knife) => {
                self.activity = Some(Activity::Fletching);
            }
            (Item::BrumaHerb, Item::UnfinishedPotion)
                if self.inventory_contains(Item::UnfinishedPotion) =>
            {
                if self.take(Item::BrumaHerb, 1) == 1 {
                    self.take(Item::UnfinishedPotion, 1);
                    self.give(Item::Rejuvenation4, 1);
                    self.stats.potions_mixed += 1;
                }
            }
            _ => debug!(%item, %target, "sim: nothing happens"),
        }
    }

    fn walk_to(&mut self, point: WorldPoint) {
        self.bank_open = false;
        self.pending = None;
        if !matches!(self.activity, Some(Activity::Fletching)) {
            self.activity = None;
        }
        self.destination = (point != self.player).then_some(point);
    }

    fn deposit_inventory(&mut self) {
        if !self.bank_open {
            return;
        }
        for (item, quantity) in std::mem::take(&mut self.inventory) {
            *self.bank.entry(item).or_insert(0) += quantity;
        }
    }

    fn withdraw(&mut self, item: Item, quantity: u32) {
        if !self.bank_open {
            return;
        }
        let free = self.free_slots();
        let Some(stored) = self.bank.get_mut(&item) else {
            return;
        };
        let moved = quantity.min(*stored).min(free);
        *stored -= moved;
        if *stored == 0 {
            self.bank.remove(&item);
        }
        if moved > 0 {
            self.give(item, moved);
        }
    }

    fn queue_click(&mut self, _region: ClickRegion) {
        self.stats.clicks += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
