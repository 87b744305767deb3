//! Probability calibration helpers.
//!
//! Two timing models drive the stochastic actions and event generators:
//!
//! - **Per-timestep Bernoulli**: a trial every tick whose probability is
//!   chosen so that the cumulative success probability over `t` ticks equals a
//!   configured target: `p_tick = 1 - (1 - p_target)^(1/t)`.
//! - **Gaussian success time**: a success time drawn from `N(μ, σ)` where μ
//!   and σ are chosen so that `P(start ≤ X ≤ end)` equals the configured
//!   success probability, with a skew shifting mass left or right.

/// Per-timestep probability needed for an overall success probability of
/// `required` over `timesteps` independent trials.
///
/// `timesteps` below one is clamped to one (a single trial carries the whole
/// probability) and `required` is clamped to [0, 1].
pub fn probability_per_timestep(timesteps: f64, required: f64) -> f64 {
    let t = if timesteps.is_finite() && timesteps >= 1.0 { timesteps } else { 1.0 };
    let p = required.clamp(0.0, 1.0);
    1.0 - (1.0 - p).powf(1.0 / t)
}

/// Mean and standard deviation of a calibrated normal distribution.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct GaussianWindow {
    pub mean:    f64,
    pub std_dev: f64,
}

/// Offset keeping the percentiles away from 0 and 1, where the quantile
/// function diverges.
const PERCENTILE_EPSILON: f64 = 1e-7;

/// Fit `N(μ, σ)` such that `P(start ≤ X ≤ end) = success_probability`.
///
/// With failure probability `pf = 1 - ps` and `h = pf / 2`, the left and
/// right percentiles are `-h·skew + h` and `-h·skew + 1 - h`.  `skew` in
/// `[-1, 1]`: positive values move the failure mass past `end` (success
/// tends to come late), negative values move it before `start` (success
/// tends to come early), zero splits it evenly.
pub fn gaussian_window(start: f64, end: f64, success_probability: f64, skew: f64) -> GaussianWindow {
    let half_fail = (1.0 - success_probability.clamp(0.0, 1.0)) / 2.0;
    let left = -half_fail * skew + half_fail;
    let right = -half_fail * skew + (1.0 - half_fail);

    let z1 = ndtri(left + PERCENTILE_EPSILON);
    let z2 = ndtri(right - PERCENTILE_EPSILON);

    let std_dev = (start - end) / (z1 - z2);
    let mean = (z1 * end - z2 * start) / (z1 - z2);
    GaussianWindow { mean, std_dev }
}

// ── Inverse standard normal CDF ───────────────────────────────────────────────

// Coefficients of Acklam's rational approximation (relative error < 1.15e-9).
const A: [f64; 6] = [
    -3.969_683_028_665_376e1,
    2.209_460_984_245_205e2,
    -2.759_285_104_469_687e2,
    1.383_577_518_672_69e2,
    -3.066_479_806_614_716e1,
    2.506_628_277_459_239,
];
const B: [f64; 5] = [
    -5.447_609_879_822_406e1,
    1.615_858_368_580_409e2,
    -1.556_989_798_598_866e2,
    6.680_131_188_771_972e1,
    -1.328_068_155_288_572e1,
];
const C: [f64; 6] = [
    -7.784_894_002_430_293e-3,
    -3.223_964_580_411_365e-1,
    -2.400_758_277_161_838,
    -2.549_732_539_343_734,
    4.374_664_141_464_968,
    2.938_163_982_698_783,
];
const D: [f64; 4] = [
    7.784_695_709_041_462e-3,
    3.224_671_290_700_398e-1,
    2.445_134_137_142_996,
    3.754_408_661_907_416,
];

const P_LOW: f64 = 0.024_25;
const P_HIGH: f64 = 1.0 - P_LOW;

/// Quantile function of the standard normal distribution.
///
/// Returns `-inf` for `p <= 0`, `+inf` for `p >= 1` and `NaN` for `NaN`.
pub fn ndtri(p: f64) -> f64 {
    if p.is_nan() {
        return f64::NAN;
    }
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= P_HIGH {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}
