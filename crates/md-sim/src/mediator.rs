//! The decision-maker seam.

use md_action::{ActionArgs, DO_NOTHING};

use crate::{FutureShift, Sim, SimResult};

/// A raw action choice: a vocabulary code plus optional shift arguments.
///
/// The choice has not yet been reconciled with the pending action; see
/// [`Sim::reconcile`].
#[derive(Clone, Debug, PartialEq)]
pub struct Choice {
    pub action: String,
    pub args:   ActionArgs,
}

impl Choice {
    pub fn new(action: impl Into<String>) -> Self {
        Choice { action: action.into(), args: ActionArgs::default() }
    }

    pub fn with_args(mut self, args: ActionArgs) -> Self {
        self.args = args;
        self
    }

    pub fn nothing() -> Self {
        Choice::new(DO_NOTHING)
    }
}

/// Picks an action for the current state of a running simulation.
///
/// `Send` so a batch can build one mediator per worker thread.
pub trait Mediator: Send {
    /// The action to request this tick.
    fn choose(&mut self, sim: &Sim) -> SimResult<Choice>;

    /// The next level shift this mediator expects to request, if it can
    /// predict one.  Only used for display.
    fn future_action(&mut self, _sim: &Sim) -> SimResult<Option<FutureShift>> {
        Ok(None)
    }

    /// Called after every `reset`; clears per-run memory.
    fn reset(&mut self) {}
}

/// A mediator that never acts.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopMediator;

impl Mediator for NoopMediator {
    fn choose(&mut self, _sim: &Sim) -> SimResult<Choice> {
        Ok(Choice::nothing())
    }
}
