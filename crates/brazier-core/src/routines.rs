//! The three phase programs for the Wintertodt arena.
//!
//! Start banks and heads to the waiting area. Prep gathers tools and potion
//! ingredients during the intermission and lights the brazier when the round
//! opens. Game chops, fletches and feeds until the fuel runs out, then starts
//! over.

use crate::config::Config;
use crate::context::{Progress, ProgressCheck, RunContext};
use crate::error::Result;
use crate::game::{BrazierState, ClickRegion, Game, ObjectAction, ObjectKind};
use crate::orchestrator::Playbook;
use crate::position::Position;
use crate::program::{Flow, ProgramBuilder, StepProgram};
use crate::survival::{best_axe, handle_warmth};
use crate::types::{Item, Phase, Skill, WorldPoint, POTIONS};
use std::marker::PhantomData;
use tracing::{debug, warn};

type Builder<W> = ProgramBuilder<W, RunContext>;

// ---------------------------------------------------------------------------
// Wintertodt playbook
// ---------------------------------------------------------------------------

pub struct Wintertodt<W> {
    config: Config,
    _world: PhantomData<fn(&mut W)>,
}

impl<W> Wintertodt<W> {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            _world: PhantomData,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl<W: Game + 'static> Playbook for Wintertodt<W> {
    type World = W;
    type Context = RunContext;

    fn program(&self, phase: Phase, position: &Position) -> Result<StepProgram<W, RunContext>> {
        match phase {
            Phase::Start => start_program(&self.config, position),
            Phase::Prep => prep_program(&self.config, position),
            Phase::Game => game_program(&self.config, position),
        }
    }

    fn survive(&self, world: &mut W) -> bool {
        handle_warmth(world, &self.config.survival)
    }

    fn round_over(&self, world: &W) -> bool {
        world.round_timer() != 0
    }
}

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

/// Wait until the player stands within `radius` tiles of `point`, issuing a
/// walk whenever they have stopped short.
fn walk_to<W: Game + 'static>(b: &mut Builder<W>, point: WorldPoint, radius: u32) {
    b.delay_until(move |w: &mut W, _| {
        if w.player_position().distance(point) <= radius {
            return true;
        }
        if !w.is_moving() {
            w.walk_to(point);
        }
        false
    });
}

fn wait_for_intermission<W: Game + 'static>(b: &mut Builder<W>) {
    b.delay_until(|w: &mut W, _| w.round_timer() > 0);
}

/// Interact with the nearest `kind` object, clicking its box first.
fn use_object<W: Game>(w: &mut W, kind: ObjectKind, action: ObjectAction) -> bool {
    match w.nearest_object(kind, None) {
        Some(object) => {
            w.queue_click(ClickRegion::Object(object.position));
            w.interact_object(&object, action);
            true
        }
        None => {
            debug!(?kind, "no object in sight");
            false
        }
    }
}

fn has_axe<W: Game>(w: &W) -> bool {
    w.inventory_matching(" axe").iter().any(|item| item.is_axe())
}

// ---------------------------------------------------------------------------
// Start
// ---------------------------------------------------------------------------

/// Open the bank, empty the inventory, and take out the best usable axe
/// plus the knife, tinderbox and hammer.
fn banking<W: Game + 'static>(bank: WorldPoint) -> Builder<W> {
    let mut b = Builder::new();
    b.delay_until(move |w: &mut W, _| {
        if w.bank_is_open() {
            return true;
        }
        if !w.is_moving() {
            if let Some(chest) = w.nearest_object(ObjectKind::BankChest, Some(bank)) {
                w.interact_object(&chest, ObjectAction::Verb("Use"));
            }
        }
        false
    })
    .add(|w: &mut W, _| w.deposit_inventory())
    .add(|w: &mut W, _| match best_axe(w) {
        Some(axe) => w.withdraw(axe, 1),
        None => warn!("no usable axe in the bank; one will come from the crate"),
    });
    for tool in [Item::Knife, Item::Tinderbox, Item::Hammer] {
        b.add(move |w: &mut W, _| w.withdraw(tool, 1));
    }
    b
}

fn start_program<W: Game + 'static>(
    cfg: &Config,
    position: &Position,
) -> Result<StepProgram<W, RunContext>> {
    let radius = cfg.supplies.arrival_radius;
    let mut b = Builder::new();
    walk_to(&mut b, position.bank, radius);
    b.append(banking(position.bank));
    walk_to(&mut b, cfg.waiting_area, radius);
    wait_for_intermission(&mut b);
    b.build()
}

// ---------------------------------------------------------------------------
// Prep
// ---------------------------------------------------------------------------

/// Loot `item` from its crate until one is carried.
fn loot_until_held<W: Game + 'static>(b: &mut Builder<W>, item: Item, crate_kind: ObjectKind) {
    b.delay_until(move |w: &mut W, _| {
        if w.inventory_contains(item) {
            return true;
        }
        if w.is_idle() {
            use_object(w, crate_kind, ObjectAction::Index(0));
        }
        false
    });
}

fn prep_program<W: Game + 'static>(
    cfg: &Config,
    position: &Position,
) -> Result<StepProgram<W, RunContext>> {
    let supplies = cfg.supplies.clone();
    let radius = supplies.arrival_radius;
    let brazier = position.brazier;

    let mut b = Builder::new();
    let check = b.label("check");
    let tinderbox = b.label("tinderbox");
    let knife = b.label("knife");
    let hammer = b.label("hammer");
    let axe = b.label("axe");
    let pots = b.label("pots");
    let ready = b.label("ready");

    wait_for_intermission(&mut b);

    b.mark(&check);
    {
        let (tinderbox, knife, hammer, axe, pots, ready) = (
            tinderbox.clone(),
            knife.clone(),
            hammer.clone(),
            axe.clone(),
            pots.clone(),
            ready.clone(),
        );
        let min_potions = supplies.min_potions;
        b.branch(move |w: &mut W, _| {
            let target = if !w.inventory_contains(Item::Tinderbox) {
                &tinderbox
            } else if !w.inventory_contains(Item::Knife) {
                &knife
            } else if !w.inventory_contains(Item::Hammer) {
                &hammer
            } else if !has_axe(w) {
                &axe
            } else if w.inventory_count_any(POTIONS) < min_potions {
                &pots
            } else {
                &ready
            };
            debug!(next = target.name(), "prep check");
            Flow::Jump(target.clone())
        });
    }

    for (label, item, crate_kind) in [
        (&tinderbox, Item::Tinderbox, ObjectKind::TinderboxCrate),
        (&knife, Item::Knife, ObjectKind::KnifeCrate),
        (&hammer, Item::Hammer, ObjectKind::HammerCrate),
    ] {
        b.mark(label);
        loot_until_held(&mut b, item, crate_kind);
        b.jump(&check);
    }

    b.mark(&axe);
    b.delay_until(|w: &mut W, _| {
        if has_axe(w) {
            return true;
        }
        if w.is_idle() {
            use_object(w, ObjectKind::AxeCrate, ObjectAction::Index(0));
        }
        false
    });
    b.jump(&check);

    b.mark(&pots);
    let vial_target = supplies.vial_target;
    b.delay_until(move |w: &mut W, _| {
        if w.inventory_count(Item::UnfinishedPotion) >= vial_target {
            return true;
        }
        if !w.is_moving() {
            use_object(w, ObjectKind::VialCrate, ObjectAction::Index(1));
        }
        false
    });
    walk_to(&mut b, position.herb_roots, radius);
    let herb_target = supplies.herb_target;
    b.delay_until(move |w: &mut W, _| {
        if w.inventory_count(Item::BrumaHerb) >= herb_target {
            return true;
        }
        if w.is_idle() {
            use_object(w, ObjectKind::HerbRoots, ObjectAction::Verb("Pick"));
        }
        false
    });
    // Head for the brazier while mixing, one herb per tick.
    b.delay_until(move |w: &mut W, _| {
        if !w.is_moving() && w.player_position().distance(brazier) > radius {
            w.walk_to(brazier);
        }
        if w.inventory_contains(Item::BrumaHerb) && w.inventory_contains(Item::UnfinishedPotion) {
            w.queue_click(ClickRegion::SideMenu);
            w.use_item_on(Item::BrumaHerb, Item::UnfinishedPotion);
            return false;
        }
        true
    });
    b.delay_until(|w: &mut W, _| !w.is_moving());

    b.mark(&ready);
    walk_to(&mut b, brazier, radius);
    b.add(|w: &mut W, ctx: &mut RunContext| {
        ctx.ignition_xp = Some(w.experience(Skill::Firemaking));
    });
    b.delay_until(|w: &mut W, _| w.round_timer() == 0);
    b.delay_until(move |w: &mut W, ctx: &mut RunContext| {
        let state = BrazierState::observe(w, brazier);
        let xp = w.experience(Skill::Firemaking);
        let lit_by_us = ctx.ignition_xp.is_some_and(|before| xp > before);
        if state == BrazierState::Lit || lit_by_us {
            ctx.ignition_xp = None;
            return true;
        }
        state.interact(w, brazier);
        false
    });

    b.build()
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

fn game_program<W: Game + 'static>(
    cfg: &Config,
    position: &Position,
) -> Result<StepProgram<W, RunContext>> {
    let supplies = cfg.supplies.clone();
    let radius = supplies.arrival_radius;
    let retry = supplies.retry_ticks;
    let root_target = supplies.root_target;
    let brazier = position.brazier;

    let mut b = Builder::new();
    walk_to(&mut b, position.roots, radius);

    b.delay_until(move |w: &mut W, _| {
        if w.inventory_count(Item::BrumaRoot) >= root_target {
            return true;
        }
        if w.is_idle() && !use_object(w, ObjectKind::BrumaRoots, ObjectAction::Verb("Chop")) {
            warn!("no bruma roots nearby");
        }
        false
    });

    // Fletch on the way back. A zero timestamp makes the first check stall,
    // which issues the knife-on-root right away.
    b.add(move |w: &mut W, ctx: &mut RunContext| {
        w.walk_to(brazier);
        ctx.fletching = Some(Progress::new(w.experience(Skill::Fletching), 0));
    });
    b.delay_until(move |w: &mut W, ctx: &mut RunContext| {
        if !w.inventory_contains(Item::BrumaRoot) {
            ctx.fletching = None;
            return true;
        }
        if !w.is_moving() && w.player_position().distance(brazier) > radius {
            w.walk_to(brazier);
        }
        let xp = w.experience(Skill::Fletching);
        let now = w.tick_count();
        let progress = ctx.fletching.get_or_insert(Progress::new(xp, 0));
        if progress.check(xp, now, retry) == ProgressCheck::Stalled {
            w.queue_click(ClickRegion::SideMenu);
            w.use_item_on(Item::Knife, Item::BrumaRoot);
        }
        false
    });

    walk_to(&mut b, brazier, radius);
    b.delay_until(move |w: &mut W, ctx: &mut RunContext| {
        if w.inventory_count_any(&[Item::BrumaKindling, Item::BrumaRoot]) == 0 {
            ctx.feeding = None;
            return true;
        }
        let xp = w.experience(Skill::Firemaking);
        let now = w.tick_count();
        // The first feed waits a full retry period after arriving.
        let progress = ctx.feeding.get_or_insert(Progress::new(xp, now));
        match BrazierState::observe(w, brazier) {
            BrazierState::Lit => {
                if progress.check(xp, now, retry) == ProgressCheck::Stalled {
                    BrazierState::Lit.interact(w, brazier);
                }
            }
            state @ (BrazierState::Unlit | BrazierState::Broken) => {
                debug!(?state, "brazier needs attention");
                state.interact(w, brazier);
            }
            BrazierState::Unknown => {}
        }
        false
    });

    b.build()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimSettings, SimWorld};
    use crate::program::StepStatus;

    fn quiet() -> SimSettings {
        SimSettings {
            brazier_break_chance: 0.0,
            brazier_douse_chance: 0.0,
            ..SimSettings::default()
        }
    }

    fn site() -> Position {
        Config::default().sites[0].clone()
    }

    /// Step `program` against `world`, advancing the world after each step,
    /// until it completes or `limit` ticks pass.
    fn drive(
        program: &mut StepProgram<SimWorld, RunContext>,
        world: &mut SimWorld,
        limit: u32,
    ) -> bool {
        for _ in 0..limit {
            if program.step(world) == StepStatus::Complete {
                return true;
            }
            world.advance();
        }
        false
    }

    #[test]
    fn every_phase_builds_for_every_default_site() {
        let playbook: Wintertodt<SimWorld> = Wintertodt::new(Config::default());
        for position in &Config::default().sites {
            for &phase in Phase::all() {
                let program = playbook.program(phase, position).unwrap();
                assert!(!program.is_empty(), "{phase} at {}", position.name);
            }
        }
    }

    #[test]
    fn prep_labels_land_where_expected() {
        let program = prep_program::<SimWorld>(&Config::default(), &site()).unwrap();
        assert_eq!(program.label_at(1), Some("check"));
        assert_eq!(program.label_at(2), Some("tinderbox"));
        assert_eq!(program.label_at(10), Some("pots"));
        assert_eq!(program.label_at(15), Some("ready"));
    }

    #[test]
    fn start_banks_and_reaches_the_waiting_area() {
        let cfg = Config::default();
        let mut world = SimWorld::new(quiet());
        let mut program = start_program::<SimWorld>(&cfg, &site()).unwrap();

        assert!(drive(&mut program, &mut world, 200));
        assert!(world.inventory_contains(Item::RuneAxe), "best axe for level 50");
        assert!(!world.inventory_contains(Item::BronzeAxe));
        assert!(world.inventory_contains(Item::Knife));
        assert!(!world.inventory_contains(Item::Tinderbox), "not in the bank");
        assert!(world.player_position().distance(cfg.waiting_area) <= 2);
        assert!(world.round_timer() > 0);
    }

    #[test]
    fn prep_loots_missing_tools_and_lights_the_brazier() {
        let cfg = Config::default();
        let position = site();
        let mut world = SimWorld::new(quiet());
        world.give(Item::RuneAxe, 1);
        world.give(Item::Knife, 1);
        world.skip_to_next_period();
        assert!(world.round_timer() > 0);

        let mut program = prep_program::<SimWorld>(&cfg, &position).unwrap();
        assert!(drive(&mut program, &mut world, 400));

        assert!(world.inventory_contains(Item::Tinderbox));
        assert!(world.inventory_contains(Item::Hammer));
        assert_eq!(world.inventory_count(Item::Rejuvenation4), 5);
        assert_eq!(world.brazier_state(position.brazier), BrazierState::Lit);
        assert!(program.context().is_empty());
    }

    #[test]
    fn prep_skips_gathering_with_enough_potions() {
        let cfg = Config::default();
        let mut world = SimWorld::new(quiet());
        for item in [Item::RuneAxe, Item::Knife, Item::Tinderbox, Item::Hammer] {
            world.give(item, 1);
        }
        world.give(Item::Rejuvenation3, 2);
        world.skip_to_next_period();

        let mut program = prep_program::<SimWorld>(&cfg, &site()).unwrap();
        program.step(&mut world);
        program.step(&mut world);
        assert_eq!(program.label_at(program.cursor()), Some("ready"));
    }

    #[test]
    fn game_chops_fletches_and_feeds() {
        let cfg = Config::default();
        let position = site();
        let mut world = SimWorld::new(SimSettings {
            opening_round_ticks: 1_000,
            ..quiet()
        });
        for item in [Item::RuneAxe, Item::Knife, Item::Tinderbox, Item::Hammer] {
            world.give(item, 1);
        }
        world.set_brazier_state(position.brazier, BrazierState::Lit);

        let mut program = game_program::<SimWorld>(&cfg, &position).unwrap();
        assert!(drive(&mut program, &mut world, 600));

        let stats = world.stats().clone();
        assert!(stats.roots_chopped >= cfg.supplies.root_target);
        assert!(stats.kindling_fletched > 0);
        assert_eq!(stats.fuel_fed, stats.roots_chopped);
        assert_eq!(world.inventory_count_any(&[Item::BrumaRoot, Item::BrumaKindling]), 0);
        assert!(program.context().is_empty());
    }

    #[test]
    fn feeding_relights_and_fixes_the_brazier() {
        let mut cfg = Config::default();
        // Nothing to chop: go straight to the brazier with the kindling held.
        cfg.supplies.root_target = 0;
        let position = site();
        let mut world = SimWorld::new(SimSettings {
            opening_round_ticks: 1_000,
            ..quiet()
        });
        for item in [Item::Knife, Item::Tinderbox, Item::Hammer] {
            world.give(item, 1);
        }
        world.give(Item::BrumaKindling, 3);
        world.teleport(position.brazier);
        world.set_brazier_state(position.brazier, BrazierState::Broken);

        let mut program = game_program::<SimWorld>(&cfg, &position).unwrap();
        assert!(drive(&mut program, &mut world, 300));
        assert_eq!(world.stats().braziers_fixed, 1);
        assert_eq!(world.stats().braziers_lit, 1);
        assert_eq!(world.stats().fuel_fed, 3);
    }

    #[test]
    fn feeding_waits_a_retry_period_before_the_first_feed() {
        let mut cfg = Config::default();
        cfg.supplies.root_target = 0;
        let retry = cfg.supplies.retry_ticks;
        let position = site();
        let mut world = SimWorld::new(SimSettings {
            opening_round_ticks: 1_000,
            ..quiet()
        });
        world.give(Item::Knife, 1);
        world.give(Item::BrumaKindling, 3);
        world.teleport(position.brazier);
        world.set_brazier_state(position.brazier, BrazierState::Lit);

        let mut program = game_program::<SimWorld>(&cfg, &position).unwrap();
        let feed = program.len() - 1;
        for _ in 0..300 {
            if program.cursor() == feed {
                break;
            }
            program.step(&mut world);
            world.advance();
        }
        assert_eq!(program.cursor(), feed);
        for _ in 0..20 {
            if !world.is_moving() {
                break;
            }
            world.advance();
        }

        for poll in 0..retry {
            assert_eq!(program.step(&mut world), StepStatus::Running);
            assert!(world.is_idle(), "fed on poll {poll}");
            world.advance();
        }
        assert!(drive(&mut program, &mut world, 300));
        assert_eq!(world.stats().fuel_fed, 3);
    }

    #[test]
    fn survive_drinks_and_round_over_reads_the_timer() {
        let playbook: Wintertodt<SimWorld> = Wintertodt::new(Config::default());
        let mut world = SimWorld::new(quiet());
        assert!(!playbook.round_over(&world));
        world.skip_to_next_period();
        assert!(playbook.round_over(&world));

        world.set_warmth(20);
        world.give(Item::Rejuvenation4, 1);
        assert!(playbook.survive(&mut world));
        assert_eq!(world.warmth_level(), 60);
    }
}
