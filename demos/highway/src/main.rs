//! highway — batch evaluation of a rule-based mediator.
//!
//! Parses the embedded decision trees, runs one observed episode that prints
//! every level switch, then runs a seeded batch over generated 100 km roads
//! and prints the aggregated report as JSON.
//!
//! ```text
//! cargo run -p highway --release -- [runs]
//! RUST_LOG=md_sim=debug cargo run -p highway -- 4
//! ```

use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use md_core::SimConfig;
use md_sim::{run_batch, run_episode, seed_range, SimBuilder, SimObserver, TickReport, TreeMediator};

// ── Constants ─────────────────────────────────────────────────────────────────

const RUNS:      u64 = 50;
const BASE_SEED: u64 = 1;

const ROOT_TREE: &str = "mediator.tree";
const TREES: [(&str, &str); 3] = [
    ("mediator.tree", include_str!("../trees/mediator.tree")),
    ("shift_up.tree", include_str!("../trees/shift_up.tree")),
    ("driver.tree",   include_str!("../trees/driver.tree")),
];

// ── Observer ──────────────────────────────────────────────────────────────────

/// Prints level switches and counts ticks.
#[derive(Default)]
struct SwitchLogger {
    ticks:    u64,
    switches: u64,
}

impl SimObserver for SwitchLogger {
    fn on_tick_end(&mut self, report: &TickReport) {
        self.ticks += 1;
        if !report.snapshot.switched {
            return;
        }
        self.switches += 1;
        let s = &report.snapshot;
        println!(
            "  {:>6.0} s  {:>7.3} km  {:>5.1} km/h  -> {}  (road max {})",
            s.time, s.position, s.speed, s.level, s.road_max_level,
        );
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let runs = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<u64>().with_context(|| format!("invalid run count {arg:?}"))?,
        None => RUNS,
    };

    // 1. Scenario and mediator.
    let config = SimConfig::baseline();
    let mut registry = TreeMediator::registry();
    for (name, source) in TREES {
        registry = registry.with_source(name, source)?;
    }
    let tree = registry.parse(ROOT_TREE)?;
    info!(tree = tree.name(), actions = ?tree.actions(), "mediator tree parsed");

    // 2. One observed episode.
    println!("=== highway: single episode (seed {BASE_SEED}) ===");
    let mut sim = SimBuilder::new(config.clone()).build()?;
    let mut mediator = TreeMediator::new(tree.clone());
    let mut logger = SwitchLogger::default();
    let metrics = run_episode(&mut sim, &mut mediator, &mut logger, BASE_SEED, true)?;
    println!(
        "  {} ticks, {} switches, {} actions, road {:.1} km, emergency stop: {}",
        logger.ticks, logger.switches, metrics.action_count, metrics.road_length, metrics.emergency_stop,
    );
    println!();

    // 3. Batch.
    println!("=== highway: batch of {runs} runs ===");
    let t0 = Instant::now();
    let stats = run_batch(&config, None, &seed_range(BASE_SEED, runs), || {
        Ok(TreeMediator::new(tree.clone()))
    })?;
    let report = stats.report(t0.elapsed());

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
