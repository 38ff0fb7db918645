use crate::output::{print_fields, print_json};
use anyhow::Context;
use brazier_core::config::Config;
use brazier_core::game::Game;
use brazier_core::orchestrator::{Orchestrator, TickOutcome};
use brazier_core::position::PositionSelector;
use brazier_core::routines::Wintertodt;
use brazier_core::sim::{SimSettings, SimStats, SimWorld};
use brazier_core::status::{ActivitySwitch, StatusLine};
use brazier_core::types::{Phase, Skill};
use chrono::{DateTime, Utc};
use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Args)]
pub struct RunArgs {
    /// Number of world ticks to simulate
    #[arg(long, default_value = "2000")]
    pub ticks: u64,

    /// Seed for both the site selector and the simulated world
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Flip the start/stop switch off at this tick
    #[arg(long)]
    pub stop_at: Option<u64>,

    /// Woodcutting level of the simulated player
    #[arg(long, default_value = "50")]
    pub woodcutting_level: u32,

    /// Log cycle starts and phase changes
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

#[derive(Debug, Default, Serialize)]
struct OutcomeCounts {
    idle: u64,
    stopped: u64,
    intervened: u64,
    round_resets: u64,
    stepped: u64,
    advanced: u64,
}

impl OutcomeCounts {
    fn record(&mut self, outcome: TickOutcome) {
        match outcome {
            TickOutcome::Idle => self.idle += 1,
            TickOutcome::Stopped { .. } => self.stopped += 1,
            TickOutcome::Intervened { .. } => self.intervened += 1,
            TickOutcome::RoundReset => self.round_resets += 1,
            TickOutcome::Stepped { .. } => self.stepped += 1,
            TickOutcome::Advanced { .. } => self.advanced += 1,
        }
    }
}

#[derive(Serialize)]
struct RunSummary {
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    seed: u64,
    ticks: u64,
    cycles: u64,
    phase: Option<Phase>,
    site: Option<String>,
    status: StatusLine,
    phase_ticks: BTreeMap<Phase, u64>,
    outcomes: OutcomeCounts,
    experience: BTreeMap<Skill, u32>,
    warmth: u32,
    world: SimStats,
}

pub fn run(config_path: &Path, args: RunArgs, json: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default(config_path).context("failed to load config")?;
    config.ensure_valid().context("refusing to run with an invalid config")?;

    let mut world = SimWorld::from_config(
        SimSettings {
            seed: args.seed,
            woodcutting_level: args.woodcutting_level,
            ..SimSettings::default()
        },
        &config,
    );
    let selector = PositionSelector::new(config.sites.clone())?;
    let switch = ActivitySwitch::new(true);
    let mut orchestrator = Orchestrator::new(
        Wintertodt::<SimWorld>::new(config),
        selector,
        StdRng::seed_from_u64(args.seed),
        switch.clone(),
    )
    .context("failed to build phase programs")?;
    let status = orchestrator.status();

    let started_at = Utc::now();
    let mut outcomes = OutcomeCounts::default();
    let mut phase_ticks: BTreeMap<Phase, u64> = BTreeMap::new();

    for tick in 0..args.ticks {
        if args.stop_at == Some(tick) {
            switch.set(false);
        }
        let outcome = orchestrator.tick(&mut world)?;
        outcomes.record(outcome);
        if let Some(phase) = orchestrator.phase() {
            *phase_ticks.entry(phase).or_insert(0) += 1;
        }
        world.advance();
    }

    let summary = RunSummary {
        started_at,
        finished_at: Utc::now(),
        seed: args.seed,
        ticks: args.ticks,
        cycles: orchestrator.cycles_started(),
        phase: orchestrator.phase(),
        site: orchestrator.position().map(|p| p.name.clone()),
        status: status.render(),
        phase_ticks,
        outcomes,
        experience: Skill::all()
            .iter()
            .map(|&s| (s, world.experience(s)))
            .collect(),
        warmth: world.warmth_level(),
        world: world.stats().clone(),
    };

    if json {
        return print_json(&summary);
    }
    print_summary(&summary);
    Ok(())
}

fn print_summary(s: &RunSummary) {
    let elapsed = s.finished_at - s.started_at;
    let mut fields = vec![
        ("seed", s.seed.to_string()),
        ("ticks", s.ticks.to_string()),
        ("elapsed", format!("{}ms", elapsed.num_milliseconds())),
        ("cycles", s.cycles.to_string()),
        ("status", s.status.text.to_string()),
        ("site", s.site.clone().unwrap_or_else(|| "-".to_string())),
    ];
    for &phase in Phase::all() {
        let ticks = s.phase_ticks.get(&phase).copied().unwrap_or(0);
        fields.push((phase.as_str(), format!("{ticks} ticks")));
    }
    fields.extend([
        ("round resets", s.outcomes.round_resets.to_string()),
        ("interventions", s.outcomes.intervened.to_string()),
        ("rounds", s.world.rounds_completed.to_string()),
        ("roots chopped", s.world.roots_chopped.to_string()),
        ("kindling", s.world.kindling_fletched.to_string()),
        ("fuel fed", s.world.fuel_fed.to_string()),
        ("doses drunk", s.world.doses_drunk.to_string()),
        ("warmth", s.warmth.to_string()),
    ]);
    for (skill, xp) in &s.experience {
        fields.push((skill.as_str(), format!("{xp} xp")));
    }
    print_fields(&fields);
}
