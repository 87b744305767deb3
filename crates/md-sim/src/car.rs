//! The longitudinal car model.

use md_core::{round_to, Level, SimConfig, SimRng};
use md_road::RouteSample;

/// Chance per tick of a small speed perturbation inside the tolerance band.
const DRIFT_P_AUTOMATED: f64 = 0.01;
const DRIFT_P_MANUAL: f64 = 0.02;

/// Position (km), speed (km/h) and automation level of the ego vehicle.
///
/// The car either drives toward a target speed with bounded acceleration or
/// replays recorded route samples.  Positions are rounded to 5 decimals.
#[derive(Clone, Debug)]
pub struct Car {
    position:        f64,
    speed:           f64,
    level:           Level,
    /// Simulated time of the last step.
    time:            f64,
    /// Index of the route sample replayed by the last step.
    route_index:     Option<usize>,
    acc_coefficient: f64,
    speed_tolerance: f64,
    timestep:        f64,
    rng:             SimRng,
}

impl Car {
    pub fn new(cfg: &SimConfig, rng: SimRng) -> Self {
        Car {
            position:        0.0,
            speed:           0.0,
            level:           cfg.initial_level,
            time:            0.0,
            route_index:     None,
            acc_coefficient: cfg.car.acc_coefficient,
            speed_tolerance: cfg.car.speed_tolerance,
            timestep:        cfg.timestep,
            rng,
        }
    }

    /// Drive one tick toward `target_speed`.
    pub fn drive(&mut self, time: f64, target_speed: f64) {
        self.time = time;
        let acc = self.acceleration(target_speed);
        self.speed += acc * self.timestep * 3.6;
        self.position = round_to(self.position + self.speed / (3_600.0 / self.timestep), 5);
    }

    /// Take position and speed from the route sample at `index`.
    pub fn replay(&mut self, time: f64, index: usize, sample: &RouteSample) {
        self.time = time;
        self.route_index = Some(index);
        self.speed = sample.speed;
        self.position = round_to(sample.position_m / 1_000.0, 5);
    }

    /// Acceleration (m/s²) for this tick: full throttle or brake outside the
    /// tolerance band, otherwise an occasional random nudge that stays
    /// inside it.
    fn acceleration(&mut self, target: f64) -> f64 {
        let acc = self.acc_coefficient;
        let dt = self.timestep;
        let tol = self.speed_tolerance;
        let step = acc * dt * 3.6;

        if target - (self.speed + step) > tol {
            return acc;
        }
        if (self.speed - step) - target > tol {
            return -acc;
        }
        let drift_p = if self.level > Level::L0 { DRIFT_P_AUTOMATED } else { DRIFT_P_MANUAL };
        if self.rng.unit() >= drift_p {
            return 0.0;
        }
        if self.speed <= target {
            let headroom = (target + tol - self.speed) / 3.6 / dt;
            self.rng.unit() * headroom.min(acc)
        } else {
            let headroom = -(self.speed - (target - tol)) / 3.6 / dt;
            self.rng.unit() * headroom.max(-acc)
        }
    }

    pub fn set_level(&mut self, level: Level) {
        self.level = level;
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn position(&self) -> f64 {
        self.position
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    #[inline]
    pub fn level(&self) -> Level {
        self.level
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn route_index(&self) -> Option<usize> {
        self.route_index
    }
}
