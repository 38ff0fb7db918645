//! The outer loop: one call to [`Orchestrator::tick`] per world tick.
//!
//! Each tick runs, in order: stop check, cycle start, survival override,
//! round-end override, and finally one step of the active phase's program.
//! A stop discards the whole cycle on the spot. Effectful collaborators must
//! cope with an interaction being abandoned halfway through.

use crate::error::{BrazierError, Result};
use crate::position::{Position, PositionSelector};
use crate::program::{StepProgram, StepStatus};
use crate::status::{ActivitySwitch, StatusHandle};
use crate::types::Phase;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Playbook
// ---------------------------------------------------------------------------

/// The per-game half of the orchestrator: what each phase does, and the two
/// interrupt checks that can pre-empt it.
pub trait Playbook {
    type World;
    type Context: Default;

    /// Build the program `phase` runs at `position`.
    fn program(
        &self,
        phase: Phase,
        position: &Position,
    ) -> Result<StepProgram<Self::World, Self::Context>>;

    /// Take a corrective action if one is needed. Returns `true` when it
    /// acted, which skips program stepping for this tick.
    fn survive(&self, world: &mut Self::World) -> bool;

    /// Whether the round has ended (the game should drop back to Prep).
    fn round_over(&self, world: &Self::World) -> bool;
}

// ---------------------------------------------------------------------------
// Cycle
// ---------------------------------------------------------------------------

/// The three programs of one cycle, all built against the same position.
pub struct PhasePrograms<W, C> {
    pub start: StepProgram<W, C>,
    pub prep: StepProgram<W, C>,
    pub game: StepProgram<W, C>,
}

impl<W, C> PhasePrograms<W, C> {
    pub fn get(&self, phase: Phase) -> &StepProgram<W, C> {
        match phase {
            Phase::Start => &self.start,
            Phase::Prep => &self.prep,
            Phase::Game => &self.game,
        }
    }

    pub fn get_mut(&mut self, phase: Phase) -> &mut StepProgram<W, C> {
        match phase {
            Phase::Start => &mut self.start,
            Phase::Prep => &mut self.prep,
            Phase::Game => &mut self.game,
        }
    }
}

fn build_programs<P: Playbook>(
    playbook: &P,
    position: &Position,
) -> Result<PhasePrograms<P::World, P::Context>> {
    let build = |phase: Phase| {
        playbook
            .program(phase, position)
            .map_err(|e| BrazierError::Program {
                phase: phase.to_string(),
                site: position.name.clone(),
                source: Box::new(e),
            })
    };
    Ok(PhasePrograms {
        start: build(Phase::Start)?,
        prep: build(Phase::Prep)?,
        game: build(Phase::Game)?,
    })
}

/// Everything that lives for one Start → Prep → Game… cycle.
pub struct Cycle<W, C> {
    position: Position,
    active: Phase,
    programs: PhasePrograms<W, C>,
}

impl<W, C> Cycle<W, C> {
    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn phase(&self) -> Phase {
        self.active
    }

    pub fn programs(&self) -> &PhasePrograms<W, C> {
        &self.programs
    }

    pub fn active_program(&self) -> &StepProgram<W, C> {
        self.programs.get(self.active)
    }
}

// ---------------------------------------------------------------------------
// TickOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TickOutcome {
    /// Switched off and nothing running.
    Idle,
    /// Switched off this tick; the running cycle was discarded.
    Stopped { phase: Phase },
    /// The survival check acted; no program step.
    Intervened { phase: Phase },
    /// The round ended mid-game; forced back to Prep without stepping.
    RoundReset,
    /// One instruction evaluated; the phase continues.
    Stepped { phase: Phase, cursor: usize },
    /// The phase's program completed and the table moved on.
    Advanced { from: Phase, to: Phase },
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<P: Playbook, R> {
    playbook: P,
    selector: PositionSelector,
    rng: R,
    switch: ActivitySwitch,
    status: StatusHandle,
    cycle: Option<Cycle<P::World, P::Context>>,
    /// Site of the most recent cycle, kept across stops so a restart does
    /// not land on the same site again.
    previous_site: Option<Position>,
    cycles_started: u64,
}

impl<P: Playbook, R: Rng> Orchestrator<P, R> {
    /// Build every phase program against every site once, so a badly
    /// assembled program aborts here instead of on some later tick.
    pub fn new(playbook: P, selector: PositionSelector, rng: R, switch: ActivitySwitch) -> Result<Self> {
        for site in selector.sites() {
            build_programs(&playbook, site)?;
        }
        Ok(Self {
            playbook,
            selector,
            rng,
            switch,
            status: StatusHandle::new(),
            cycle: None,
            previous_site: None,
            cycles_started: 0,
        })
    }

    pub fn switch(&self) -> &ActivitySwitch {
        &self.switch
    }

    /// A read-only handle for render callbacks.
    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    pub fn phase(&self) -> Option<Phase> {
        self.cycle.as_ref().map(|c| c.active)
    }

    pub fn position(&self) -> Option<&Position> {
        self.cycle.as_ref().map(|c| &c.position)
    }

    pub fn cycle(&self) -> Option<&Cycle<P::World, P::Context>> {
        self.cycle.as_ref()
    }

    pub fn cycles_started(&self) -> u64 {
        self.cycles_started
    }

    pub fn playbook(&self) -> &P {
        &self.playbook
    }

    fn begin_cycle(&mut self) -> Result<Cycle<P::World, P::Context>> {
        let position = self
            .selector
            .select_new(self.previous_site.as_ref(), &mut self.rng);
        let programs = build_programs(&self.playbook, &position)?;
        self.previous_site = Some(position.clone());
        self.cycles_started += 1;
        info!(site = %position.name, cycle = self.cycles_started, "starting cycle");
        Ok(Cycle {
            position,
            active: Phase::Start,
            programs,
        })
    }

    pub fn tick(&mut self, world: &mut P::World) -> Result<TickOutcome> {
        if !self.switch.is_active() {
            return Ok(match self.cycle.take() {
                Some(cycle) => {
                    info!(
                        phase = %cycle.active,
                        site = %cycle.position.name,
                        cursor = cycle.active_program().cursor(),
                        "stopped; abandoning cycle"
                    );
                    self.status.publish(None);
                    TickOutcome::Stopped {
                        phase: cycle.active,
                    }
                }
                None => TickOutcome::Idle,
            });
        }

        if self.cycle.is_none() {
            let cycle = self.begin_cycle()?;
            self.cycle = Some(cycle);
            self.status.publish(Some(Phase::Start));
        }
        let Some(cycle) = self.cycle.as_mut() else {
            return Ok(TickOutcome::Idle);
        };

        if self.playbook.survive(world) {
            debug!(phase = %cycle.active, "survival override");
            return Ok(TickOutcome::Intervened {
                phase: cycle.active,
            });
        }

        if cycle.active == Phase::Game && self.playbook.round_over(world) {
            info!(site = %cycle.position.name, "round over; back to prep");
            cycle.programs.game.reset();
            cycle.programs.prep.reset();
            cycle.active = Phase::Prep;
            self.status.publish(Some(Phase::Prep));
            return Ok(TickOutcome::RoundReset);
        }

        let phase = cycle.active;
        let program = cycle.programs.get_mut(phase);
        match program.step(world) {
            StepStatus::Running => Ok(TickOutcome::Stepped {
                phase,
                cursor: program.cursor(),
            }),
            StepStatus::Complete => {
                program.reset();
                let next = phase.transition();
                if next != phase {
                    cycle.programs.get_mut(next).reset();
                }
                cycle.active = next;
                self.status.publish(Some(next));
                info!(from = %phase, to = %next, "phase complete");
                Ok(TickOutcome::Advanced {
                    from: phase,
                    to: next,
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::default_sites;
    use crate::program::ProgramBuilder;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// A world whose knobs are flipped directly by the tests.
    #[derive(Default)]
    struct Knobs {
        cold: bool,
        round_over: bool,
        gate_open: bool,
        trace: Vec<(Phase, usize)>,
    }

    #[derive(Debug, Default, PartialEq)]
    struct Scratch {
        touched: u32,
    }

    /// Start and Prep are two immediates each. Game is an immediate, a
    /// wait on `gate_open`, and another immediate.
    struct Scripted {
        broken_game: bool,
    }

    impl Playbook for Scripted {
        type World = Knobs;
        type Context = Scratch;

        fn program(&self, phase: Phase, _position: &Position) -> Result<StepProgram<Knobs, Scratch>> {
            let mut b = ProgramBuilder::new();
            match phase {
                Phase::Start | Phase::Prep => {
                    b.add(move |w: &mut Knobs, ctx: &mut Scratch| {
                        ctx.touched += 1;
                        w.trace.push((phase, 0));
                    });
                    b.add(move |w: &mut Knobs, _: &mut Scratch| w.trace.push((phase, 1)));
                }
                Phase::Game => {
                    if self.broken_game {
                        b.label("missing");
                    }
                    b.add(|w: &mut Knobs, ctx: &mut Scratch| {
                        ctx.touched += 1;
                        w.trace.push((Phase::Game, 0));
                    });
                    b.delay_until(|w: &mut Knobs, _: &mut Scratch| w.gate_open);
                    b.add(|w: &mut Knobs, _: &mut Scratch| w.trace.push((Phase::Game, 2)));
                }
            }
            b.build()
        }

        fn survive(&self, world: &mut Knobs) -> bool {
            world.cold
        }

        fn round_over(&self, world: &Knobs) -> bool {
            world.round_over
        }
    }

    fn orchestrator(active: bool) -> Orchestrator<Scripted, StdRng> {
        Orchestrator::new(
            Scripted { broken_game: false },
            PositionSelector::new(default_sites()).unwrap(),
            StdRng::seed_from_u64(3),
            ActivitySwitch::new(active),
        )
        .unwrap()
    }

    fn run_until(o: &mut Orchestrator<Scripted, StdRng>, world: &mut Knobs, phase: Phase) {
        for _ in 0..50 {
            if o.phase() == Some(phase) {
                return;
            }
            o.tick(world).unwrap();
        }
        panic!("never reached {phase}");
    }

    #[test]
    fn unresolved_label_aborts_construction() {
        let result = Orchestrator::new(
            Scripted { broken_game: true },
            PositionSelector::new(default_sites()).unwrap(),
            StdRng::seed_from_u64(3),
            ActivitySwitch::new(true),
        );
        let err = result.err().expect("must fail");
        assert!(err.to_string().contains("missing"));
        assert!(err.to_string().contains("game"));
    }

    #[test]
    fn idle_when_switched_off() {
        let mut o = orchestrator(false);
        let mut world = Knobs::default();
        assert_eq!(o.tick(&mut world).unwrap(), TickOutcome::Idle);
        assert_eq!(o.phase(), None);
        assert_eq!(o.status().current(), None);
    }

    #[test]
    fn first_tick_starts_cycle_and_steps_start() {
        let mut o = orchestrator(true);
        let mut world = Knobs::default();
        let outcome = o.tick(&mut world).unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Stepped {
                phase: Phase::Start,
                cursor: 1
            }
        );
        assert!(o.position().is_some());
        assert_eq!(o.status().current(), Some(Phase::Start));
        assert_eq!(world.trace, vec![(Phase::Start, 0)]);
    }

    #[test]
    fn start_then_prep_then_game_with_fresh_programs() {
        let mut o = orchestrator(true);
        let mut world = Knobs::default();

        o.tick(&mut world).unwrap();
        assert_eq!(
            o.tick(&mut world).unwrap(),
            TickOutcome::Advanced {
                from: Phase::Start,
                to: Phase::Prep
            }
        );
        let cycle = o.cycle().unwrap();
        assert_eq!(cycle.active_program().cursor(), 0);
        assert_eq!(cycle.active_program().context(), &Scratch::default());
        assert_eq!(cycle.programs().start.cursor(), 0);
        assert_eq!(cycle.programs().start.context(), &Scratch::default());

        o.tick(&mut world).unwrap();
        assert_eq!(
            o.tick(&mut world).unwrap(),
            TickOutcome::Advanced {
                from: Phase::Prep,
                to: Phase::Game
            }
        );
        let cycle = o.cycle().unwrap();
        assert_eq!(cycle.active_program().cursor(), 0);
        assert_eq!(cycle.active_program().context(), &Scratch::default());
    }

    #[test]
    fn game_completion_restarts_game_at_same_position() {
        let mut o = orchestrator(true);
        let mut world = Knobs {
            gate_open: true,
            ..Knobs::default()
        };
        run_until(&mut o, &mut world, Phase::Game);
        let site = o.position().unwrap().clone();

        o.tick(&mut world).unwrap();
        o.tick(&mut world).unwrap();
        assert_eq!(
            o.tick(&mut world).unwrap(),
            TickOutcome::Advanced {
                from: Phase::Game,
                to: Phase::Game
            }
        );
        let cycle = o.cycle().unwrap();
        assert_eq!(cycle.phase(), Phase::Game);
        assert_eq!(cycle.active_program().cursor(), 0);
        assert_eq!(cycle.active_program().context(), &Scratch::default());
        assert_eq!(o.position(), Some(&site));
        assert_eq!(o.cycles_started(), 1);
    }

    #[test]
    fn round_end_forces_prep_mid_game_without_reselecting() {
        let mut o = orchestrator(true);
        let mut world = Knobs::default();
        run_until(&mut o, &mut world, Phase::Game);
        let site = o.position().unwrap().clone();

        o.tick(&mut world).unwrap();
        o.tick(&mut world).unwrap();
        let game = &o.cycle().unwrap().programs().game;
        assert_eq!(game.cursor(), 1, "parked on the wait");
        assert_eq!(game.context().touched, 1);

        world.round_over = true;
        let before = world.trace.len();
        assert_eq!(o.tick(&mut world).unwrap(), TickOutcome::RoundReset);
        assert_eq!(world.trace.len(), before, "no step on the override tick");

        let cycle = o.cycle().unwrap();
        assert_eq!(cycle.phase(), Phase::Prep);
        assert_eq!(cycle.active_program().cursor(), 0);
        assert_eq!(cycle.programs().game.cursor(), 0);
        assert_eq!(cycle.programs().game.context(), &Scratch::default());
        assert_eq!(o.position(), Some(&site));
        assert_eq!(o.cycles_started(), 1);
        assert_eq!(o.status().current(), Some(Phase::Prep));
    }

    #[test]
    fn round_end_is_ignored_outside_game() {
        let mut o = orchestrator(true);
        let mut world = Knobs {
            round_over: true,
            ..Knobs::default()
        };
        o.tick(&mut world).unwrap();
        assert_eq!(
            o.tick(&mut world).unwrap(),
            TickOutcome::Advanced {
                from: Phase::Start,
                to: Phase::Prep
            }
        );
    }

    #[test]
    fn deactivation_abandons_in_flight_state() {
        let mut o = orchestrator(true);
        let mut world = Knobs::default();
        run_until(&mut o, &mut world, Phase::Game);
        o.tick(&mut world).unwrap();
        o.tick(&mut world).unwrap();
        let game = &o.cycle().unwrap().programs().game;
        assert!(game.cursor() > 0);
        assert_ne!(game.context(), &Scratch::default());

        o.switch().set(false);
        assert_eq!(
            o.tick(&mut world).unwrap(),
            TickOutcome::Stopped { phase: Phase::Game }
        );
        assert_eq!(o.phase(), None);
        assert!(o.position().is_none());
        assert!(o.cycle().is_none());
        assert_eq!(o.status().render().text, "Inactive");
        assert_eq!(o.tick(&mut world).unwrap(), TickOutcome::Idle);
    }

    #[test]
    fn restart_picks_a_different_site() {
        let mut o = orchestrator(true);
        let mut world = Knobs::default();
        for _ in 0..20 {
            o.tick(&mut world).unwrap();
            let first = o.position().unwrap().clone();
            o.switch().set(false);
            o.tick(&mut world).unwrap();
            o.switch().set(true);
            o.tick(&mut world).unwrap();
            assert_ne!(o.position().unwrap(), &first);
            o.switch().set(false);
            o.tick(&mut world).unwrap();
            o.switch().set(true);
        }
    }

    #[test]
    fn survival_override_leaves_program_untouched() {
        let mut o = orchestrator(true);
        let mut world = Knobs::default();
        run_until(&mut o, &mut world, Phase::Game);
        o.tick(&mut world).unwrap();

        let (cursor, touched) = {
            let p = o.cycle().unwrap().active_program();
            (p.cursor(), p.context().touched)
        };
        world.cold = true;
        world.gate_open = true;
        for _ in 0..3 {
            assert_eq!(
                o.tick(&mut world).unwrap(),
                TickOutcome::Intervened { phase: Phase::Game }
            );
        }
        let p = o.cycle().unwrap().active_program();
        assert_eq!(p.cursor(), cursor);
        assert_eq!(p.context().touched, touched);
    }

    #[test]
    fn survival_override_precedes_round_end() {
        let mut o = orchestrator(true);
        let mut world = Knobs::default();
        run_until(&mut o, &mut world, Phase::Game);
        world.cold = true;
        world.round_over = true;
        assert_eq!(
            o.tick(&mut world).unwrap(),
            TickOutcome::Intervened { phase: Phase::Game }
        );
        world.cold = false;
        assert_eq!(o.tick(&mut world).unwrap(), TickOutcome::RoundReset);
    }
}
