//! Tick-completed notifications for renderers and data collectors.

use std::sync::mpsc::{self, Receiver, Sender};

use md_action::ActionCommand;
use md_core::Tick;
use tracing::debug;

use crate::{FutureShift, RunMetrics, SimSnapshot};

/// What a completed tick looked like from the outside.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    pub seed:     u64,
    pub tick:     Tick,
    /// The command applied this tick, after reconciliation with the pending
    /// action.
    pub command:  ActionCommand,
    pub snapshot: SimSnapshot,
    /// The mediator's predicted next shift, when forecasting is enabled.
    pub future:   Option<FutureShift>,
}

/// Callbacks invoked by [`run_episode`][crate::run_episode] at key points
/// of a run.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example (level logger)
///
/// ```rust,ignore
/// struct LevelLogger;
///
/// impl SimObserver for LevelLogger {
///     fn on_tick_end(&mut self, report: &TickReport) {
///         if report.snapshot.switched {
///             println!("{}: now at {}", report.tick, report.snapshot.level);
///         }
///     }
/// }
/// ```
pub trait SimObserver {
    /// Called once after `reset`, before the first tick.
    fn on_reset(&mut self, _snapshot: &SimSnapshot) {}

    /// Called after every completed tick.
    fn on_tick_end(&mut self, _report: &TickReport) {}

    /// Called once with the finalized metrics of the run.
    fn on_run_end(&mut self, _metrics: &RunMetrics) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}

// ── ChannelObserver ───────────────────────────────────────────────────────────

/// Messages sent by a [`ChannelObserver`].
#[derive(Clone, Debug, PartialEq)]
pub enum ObserverMessage {
    Reset(SimSnapshot),
    TickCompleted(TickReport),
    RunEnded(RunMetrics),
}

struct PausePoint {
    /// Block every `interval` ticks.
    interval: u64,
    ack:      Receiver<()>,
}

/// Forwards every notification over an `mpsc` channel.
///
/// In pausing mode the run blocks after every `interval`-th tick and at the
/// end of the run until the receiving side sends an acknowledgement.  If the
/// acknowledgement sender is dropped the run continues without pausing; if
/// the message receiver is dropped nothing more is sent.
pub struct ChannelObserver {
    tx:    Option<Sender<ObserverMessage>>,
    pause: Option<PausePoint>,
}

impl ChannelObserver {
    /// A non-blocking observer and the receiving end of its channel.
    pub fn new() -> (Self, Receiver<ObserverMessage>) {
        let (tx, rx) = mpsc::channel();
        (ChannelObserver { tx: Some(tx), pause: None }, rx)
    }

    /// An observer that waits for an acknowledgement every `interval` ticks
    /// (at least 1) and at run end.
    pub fn pausing(interval: u64) -> (Self, Receiver<ObserverMessage>, Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let (ack_tx, ack_rx) = mpsc::channel();
        let observer = ChannelObserver {
            tx:    Some(tx),
            pause: Some(PausePoint { interval: interval.max(1), ack: ack_rx }),
        };
        (observer, rx, ack_tx)
    }

    fn send(&mut self, message: ObserverMessage) {
        let Some(tx) = &self.tx else { return };
        if tx.send(message).is_err() {
            debug!("observer channel closed");
            self.tx = None;
            self.pause = None;
        }
    }

    fn wait(&mut self) {
        let Some(pause) = &self.pause else { return };
        if pause.ack.recv().is_err() {
            debug!("acknowledgement channel closed; no longer pausing");
            self.pause = None;
        }
    }
}

impl SimObserver for ChannelObserver {
    fn on_reset(&mut self, snapshot: &SimSnapshot) {
        self.send(ObserverMessage::Reset(snapshot.clone()));
    }

    fn on_tick_end(&mut self, report: &TickReport) {
        let tick = report.tick.0;
        self.send(ObserverMessage::TickCompleted(report.clone()));
        if self.pause.as_ref().is_some_and(|p| tick % p.interval == 0) {
            self.wait();
        }
    }

    fn on_run_end(&mut self, metrics: &RunMetrics) {
        self.send(ObserverMessage::RunEnded(metrics.clone()));
        self.wait();
    }
}
