//! Driving a [`Sim`] with a [`Mediator`] until the run ends.

use std::time::Instant;

use md_core::SimConfig;
use md_road::PresetRoad;
use tracing::{debug, info};

use crate::observer::TickReport;
use crate::stats::BatchStats;
use crate::{Mediator, NoopObserver, RunMetrics, Sim, SimBuilder, SimObserver, SimResult};

/// `runs` consecutive seeds starting at `base`.
pub fn seed_range(base: u64, runs: u64) -> Vec<u64> {
    (0..runs).map(|i| base.wrapping_add(i)).collect()
}

/// Reset `sim` with `seed` and let `mediator` drive it to the end.
///
/// Each tick the mediator's choice is reconciled with the pending action
/// before stepping.  With `forecast_future` the mediator's predicted next
/// shift is attached to every tick report.
#[tracing::instrument(level = "debug", skip(sim, mediator, observer))]
pub fn run_episode<M, O>(
    sim:             &mut Sim,
    mediator:        &mut M,
    observer:        &mut O,
    seed:            u64,
    forecast_future: bool,
) -> SimResult<RunMetrics>
where
    M: Mediator + ?Sized,
    O: SimObserver + ?Sized,
{
    let snapshot = sim.reset(seed)?;
    mediator.reset();
    observer.on_reset(&snapshot);

    loop {
        let choice = mediator.choose(sim)?;
        let future = if forecast_future { mediator.future_action(sim)? } else { None };
        let (command, outcome) = sim.step_choice(&choice)?;

        let report = TickReport {
            seed,
            tick: outcome.snapshot.tick,
            command,
            snapshot: outcome.snapshot,
            future,
        };
        observer.on_tick_end(&report);

        if outcome.done {
            break;
        }
    }

    let metrics = sim.metrics()?.clone();
    observer.on_run_end(&metrics);
    Ok(metrics)
}

/// Run one episode per seed and aggregate the results.
///
/// Every episode gets its own [`Sim`] and its own mediator from
/// `make_mediator`, so with the `parallel` feature episodes run on Rayon's
/// thread pool without sharing state.  Results are merged only after every
/// run has finished.
pub fn run_batch<M, F>(
    config:        &SimConfig,
    preset:        Option<&PresetRoad>,
    seeds:         &[u64],
    make_mediator: F,
) -> SimResult<BatchStats>
where
    M: Mediator,
    F: Fn() -> SimResult<M> + Sync,
{
    info!(runs = seeds.len(), "batch started");
    let started = Instant::now();

    let run_one = |seed: u64| -> SimResult<RunMetrics> {
        let mut builder = SimBuilder::new(config.clone());
        if let Some(preset) = preset {
            builder = builder.preset(preset.clone());
        }
        let mut sim = builder.build()?;
        let mut mediator = make_mediator()?;
        let metrics = run_episode(&mut sim, &mut mediator, &mut NoopObserver, seed, false)?;
        debug!(seed, time = metrics.time_passed, actions = metrics.action_count, "episode finished");
        Ok(metrics)
    };

    #[cfg(not(feature = "parallel"))]
    let results: Vec<RunMetrics> = seeds.iter().map(|&seed| run_one(seed)).collect::<SimResult<_>>()?;

    #[cfg(feature = "parallel")]
    let results: Vec<RunMetrics> = {
        use rayon::prelude::*;

        seeds.par_iter().map(|&seed| run_one(seed)).collect::<SimResult<_>>()?
    };

    let stats = results
        .iter()
        .map(BatchStats::from_run)
        .fold(BatchStats::new(), BatchStats::merged);

    info!(
        runs            = stats.total_runs,
        emergency_stops = stats.emergency_stops,
        elapsed_ms      = started.elapsed().as_millis() as u64,
        "batch finished"
    );
    Ok(stats)
}
