//! Headless Proc Simulation
//!
//! Runs seeded Monte-Carlo mining sessions against the in-memory world and
//! reports how often each ability fired. Actors are independent, so each one
//! gets its own engine and runs on the rayon pool.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;

use enchant_procs::catalog::AbilityCatalog;
use enchant_procs::core::{ActorId, EngineConfig, ManualClock, Result, TriggerKind};
use enchant_procs::engine::{ActivationResult, ProcEngine, ProcStats};
use enchant_procs::providers::{
    AbilityLevels, MemoryEconomy, MemoryItemStore, PriceListAutoSell, Services,
};
use enchant_procs::random::WeightedSelector;
use enchant_procs::world::{ActorView, BlockPos, ItemHandle, SparseWorld};

/// Headless proc simulation - measure activation rates
#[derive(Parser, Debug)]
#[command(name = "proc_sim")]
#[command(about = "Simulate mining sessions and report ability activation rates")]
struct Args {
    /// Simulated actors, run in parallel
    #[arg(long, default_value_t = 8)]
    actors: usize,

    /// Actions per actor
    #[arg(long, default_value_t = 10_000)]
    actions: u64,

    /// Milliseconds of game time between two actions of the same actor
    #[arg(long, default_value_t = 50)]
    interval_ms: u64,

    /// Item abilities as id:level pairs
    #[arg(long, value_delimiter = ',', default_value = "chain-break:3")]
    abilities: Vec<String>,

    /// Trigger every action fires
    #[arg(long, default_value = "block-break")]
    trigger: String,

    /// Ability catalog TOML; built-in abilities when omitted
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,
}

/// JSON output structure
#[derive(Serialize)]
struct SimReport {
    seed: u64,
    actors: usize,
    actions_per_actor: u64,
    trigger: TriggerKind,
    stats: ProcStats,
    activation_rate: f64,
    activations_by_ability: BTreeMap<String, u64>,
    blocks_cleared: u64,
    currency_earned: f64,
}

/// What one actor's session produced
#[derive(Default)]
struct ActorRun {
    stats: ProcStats,
    by_ability: BTreeMap<String, u64>,
    cleared: u64,
    earned: f64,
}

fn parse_levels(pairs: &[String]) -> std::result::Result<AbilityLevels, String> {
    let mut levels = AbilityLevels::new();
    for pair in pairs {
        let (id, level) = pair
            .split_once(':')
            .ok_or_else(|| format!("expected id:level, got '{}'", pair))?;
        let level: u32 = level
            .parse()
            .map_err(|_| format!("bad level in '{}'", pair))?;
        levels.insert(id.to_string(), level);
    }
    Ok(levels)
}

fn run_actor(
    index: usize,
    seed: u64,
    args: &Args,
    trigger: TriggerKind,
    catalog: &AbilityCatalog,
    item_levels: &AbilityLevels,
) -> Result<ActorRun> {
    let clock = ManualClock::new(1_700_000_000_000);
    let store = Arc::new(MemoryItemStore::new());
    let economy = Arc::new(MemoryEconomy::new());
    let auto_sell = PriceListAutoSell::new(economy.clone())
        .with_price("iron_ore", 4.0)
        .with_price("coal_ore", 1.5);
    let services = Services::new(store.clone())
        .with_economy(economy.clone())
        .with_auto_sell(Arc::new(auto_sell));

    let mut engine = ProcEngine::new(EngineConfig::default(), catalog.clone(), services)?
        .with_clock(Arc::new(clock.clone()))
        .with_selector(WeightedSelector::seeded(seed.wrapping_add(index as u64)));

    let actor = ActorView::new(ActorId::new());
    let mut item = ItemHandle::new("diamond_pickaxe");
    store.insert(&item, item_levels.clone());

    let mut world = SparseWorld::new();
    let mut run = ActorRun::default();

    for step in 0..args.actions {
        // Walk a tunnel along +x so every action has fresh stone around it
        let target = BlockPos::new(step as i32 % 4_096, 64, 0);
        world.fill(target - BlockPos::splat(2), target + BlockPos::splat(2), "stone");
        world.set_block(target, if step % 7 == 0 { "iron_ore" } else { "stone" });

        let report = engine.process_action(&actor, &item, Some(target), trigger, &mut world);
        for outcome in &report.outcomes {
            if let ActivationResult::Activated { cleared } = outcome.result {
                *run.by_ability.entry(outcome.ability.clone()).or_default() += 1;
                run.cleared += cleared as u64;
            }
        }
        item = report.item;
        clock.advance(args.interval_ms);
    }

    run.stats = engine.stats();
    run.earned = economy.entries().iter().map(|e| e.amount).sum();
    tracing::debug!(
        "Actor {} finished: {} activations over {} attempts",
        index,
        run.stats.activations,
        run.stats.attempts
    );
    Ok(run)
}

fn simulate(args: &Args, seed: u64) -> Result<SimReport> {
    let catalog = match &args.catalog {
        Some(path) => AbilityCatalog::load_from_toml(path)?,
        None => AbilityCatalog::with_defaults(),
    };
    let trigger: TriggerKind = args
        .trigger
        .parse()
        .map_err(enchant_procs::core::EnchantError::InvalidConfig)?;
    let item_levels = parse_levels(&args.abilities)
        .map_err(enchant_procs::core::EnchantError::InvalidConfig)?;

    for id in item_levels.keys() {
        if !catalog.contains(id) {
            return Err(enchant_procs::core::EnchantError::UnknownAbility(id.clone()));
        }
    }

    tracing::info!(
        "Simulating {} actors x {} actions with seed {}",
        args.actors,
        args.actions,
        seed
    );

    // PARALLEL: every actor owns its engine and world
    let runs: Vec<ActorRun> = (0..args.actors)
        .into_par_iter()
        .map(|index| run_actor(index, seed, args, trigger, &catalog, &item_levels))
        .collect::<Result<Vec<_>>>()?;

    let mut report = SimReport {
        seed,
        actors: args.actors,
        actions_per_actor: args.actions,
        trigger,
        stats: ProcStats::default(),
        activation_rate: 0.0,
        activations_by_ability: BTreeMap::new(),
        blocks_cleared: 0,
        currency_earned: 0.0,
    };
    for run in &runs {
        report.stats.merge(&run.stats);
        for (id, count) in &run.by_ability {
            *report.activations_by_ability.entry(id.clone()).or_default() += count;
        }
        report.blocks_cleared += run.cleared;
        report.currency_earned += run.earned;
    }
    report.activation_rate = report.stats.activation_rate();
    Ok(report)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    let report = match simulate(&args, seed) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Simulation failed: {}", e);
            std::process::exit(1);
        }
    };

    match args.format.as_str() {
        "text" => {
            println!("Proc Simulation");
            println!("===============");
            println!("Actors: {} x {} actions", report.actors, report.actions_per_actor);
            println!("Trigger: {}", report.trigger.name());
            println!("Attempts: {}", report.stats.attempts);
            println!("Activations: {}", report.stats.activations);
            println!("Activation rate: {:.3}%", report.activation_rate * 100.0);
            println!(
                "Gated: {}  Missed: {}  Cancelled: {}  Faults: {}",
                report.stats.gated, report.stats.misses, report.stats.cancelled, report.stats.faults
            );
            println!("Secondary rolls: {}", report.stats.secondary_rolls);
            for (id, count) in &report.activations_by_ability {
                println!("  {}: {}", id, count);
            }
            println!("Blocks cleared: {}", report.blocks_cleared);
            println!("Currency earned: {:.2}", report.currency_earned);
            println!("Seed: {}", report.seed);
        }
        other => {
            if other != "json" {
                eprintln!("Unknown format '{}', defaulting to json", other);
            }
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Failed to serialize report: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
