//! Simulation time model.
//!
//! # Design
//!
//! The canonical step counter is an integer `Tick`.  Simulated time is held
//! separately in seconds by `SimClock` because it does not always advance by
//! a fixed amount: with replayed route data the clock follows the recorded
//! timestamps instead of `tick * timestep`.

use std::fmt;

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute simulation step counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// Return the tick `n` steps after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Tick {
        Tick(self.0 + n)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl std::ops::Sub for Tick {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Tick) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Tracks the current tick and the simulated seconds elapsed since reset.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    /// Seconds per regular step.
    pub timestep:     f64,
    /// Number of completed steps.
    pub current_tick: Tick,
    /// Simulated seconds since reset.
    pub time_passed:  f64,
}

impl SimClock {
    pub fn new(timestep: f64) -> Self {
        Self {
            timestep,
            current_tick: Tick::ZERO,
            time_passed:  0.0,
        }
    }

    /// Advance by one regular timestep.
    #[inline]
    pub fn advance(&mut self) {
        self.current_tick = self.current_tick + 1;
        self.time_passed += self.timestep;
    }

    /// Advance one tick and jump to a recorded timestamp.
    #[inline]
    pub fn advance_to(&mut self, time_passed: f64) {
        self.current_tick = self.current_tick + 1;
        self.time_passed = time_passed;
    }

    /// Break elapsed time into (hours, minutes, seconds) for log lines.
    pub fn elapsed_hms(&self) -> (u64, u32, f64) {
        let total = self.time_passed.max(0.0);
        let hours = (total / 3_600.0).floor() as u64;
        let minutes = ((total % 3_600.0) / 60.0).floor() as u32;
        let seconds = total % 60.0;
        (hours, minutes, seconds)
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (h, m, s) = self.elapsed_hms();
        write!(f, "{} ({:02}:{:02}:{:04.1})", self.current_tick, h, m, s)
    }
}
