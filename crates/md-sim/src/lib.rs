//! `md-sim` — tick orchestrator for the mediator simulator.
//!
//! A [`Sim`] owns one road, one car, one driver, one safety evaluator and
//! at most one pending action.  A [`Mediator`] picks an action every tick;
//! [`run_episode`] drives a run to its end and [`run_batch`] aggregates many
//! seeded runs into [`BatchStats`].
//!
//! # Modules
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | `builder`       | [`SimBuilder`]: config validation, vocabulary         |
//! | `car`           | [`Car`]: speed model and route replay                 |
//! | `sim`           | [`Sim`], [`RunState`]: reset/step, reconciliation     |
//! | `mediator`      | [`Mediator`] trait, [`Choice`], [`NoopMediator`]      |
//! | `tree_mediator` | [`TreeMediator`]: decision-tree driven mediator       |
//! | `future`        | [`FutureShift`]: predicted next level shift           |
//! | `observer`      | [`SimObserver`], [`ChannelObserver`]                  |
//! | `metrics`       | [`RunMetrics`]: per-run evaluation                    |
//! | `stats`         | [`BatchStats`], [`BatchReport`]: batch aggregation    |
//! | `runner`        | [`run_episode`], [`run_batch`]                        |
//!
//! # Tick
//!
//! ```text
//! choose     mediator picks a Choice from the run's current state
//! reconcile  same as pending: DN; different: CANCEL<x>; DN over ES: CANCEL
//! step:
//!   ① Command  cancel pending; create a new action only if none pending
//!   ② Action   step pending action, resolve on outcome (level / ES)
//!   ③ Car      speed model toward the road's target speed, or replay
//!   ④ Driver   fatigue, distraction, NDRT, requests, TTD
//!   ⑤ Road     segment and dynamic events at the new position
//!   ⑥ Safety   predicates, events, run metrics
//!   ⑦ Clock    advance; ES > end of route > end of road
//! ```
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                 |
//! |------------|--------------------------------------------------------|
//! | `parallel` | Runs the episodes of a batch on Rayon's thread pool.   |
//! | `serde`    | `Serialize`/`Deserialize` on snapshots and reports.    |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use md_core::SimConfig;
//! use md_sim::{run_batch, seed_range, TreeMediator};
//!
//! let config = SimConfig::baseline();
//! let stats = run_batch(&config, None, &seed_range(1, 100), || {
//!     TreeMediator::from_source("mediator", MEDIATOR_TREE)
//! })?;
//! println!("{:?}", stats.report(elapsed));
//! ```

pub mod builder;
pub mod car;
pub mod error;
pub mod future;
pub mod mediator;
pub mod metrics;
pub mod observer;
pub mod runner;
pub mod sim;
pub mod snapshot;
pub mod stats;
pub mod tree_mediator;

#[cfg(test)]
mod tests;

pub use builder::SimBuilder;
pub use car::Car;
pub use error::{SimError, SimResult};
pub use future::FutureShift;
pub use mediator::{Choice, Mediator, NoopMediator};
pub use metrics::{KindMetrics, RunMetrics, SeverityMetrics};
pub use observer::{ChannelObserver, NoopObserver, ObserverMessage, SimObserver, TickReport};
pub use runner::{run_batch, run_episode, seed_range};
pub use sim::{RunState, Sim};
pub use snapshot::{DriverSnapshot, SimSnapshot, StepOutcome, TerminalReason};
pub use stats::{BatchReport, BatchStats, RunRow, SeverityReport};
pub use tree_mediator::{Budgets, MediatorInputs, Noise, TreeMediator};
