//! Predicting the next level shift a tree mediator will request.
//!
//! Only shifts are predicted: driver state cannot be forecast, so the tree
//! is queried with a neutral driver at the position of the next change in
//! the nominal level partition.

use md_action::{ActionArgs, ActionId};
use md_core::{Level, Variant};

use crate::tree_mediator::{choice_from, MediatorInputs};
use crate::{Sim, SimResult, TreeMediator};

/// Predictions closer than this (km) to the previous one of the same name
/// are dropped as repeats.
const REPEAT_DISTANCE: f64 = 0.1;

/// A predicted shift and the stretch of road it would cover.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FutureShift {
    pub action: ActionId,
    pub args:   ActionArgs,
    /// km.
    pub start:  f64,
    /// `start` plus the distance covered during the shift's time budget.
    pub end:    f64,
}

/// Predict the next shift `mediator` will request, skipping repeats of the
/// previous prediction of the same action.
pub fn predict(mediator: &mut TreeMediator, sim: &Sim) -> SimResult<Option<FutureShift>> {
    let run = sim.current()?;
    let road = run.road();
    let cfg = sim.config();
    let position = run.car().position();
    let now = run.time();

    let at = future_position(sim)?;
    if at >= road.total_distance() {
        return Ok(None);
    }

    let forecast = road.forecast(at, Variant::Nominal);
    let driver = run.driver();
    let inputs = MediatorInputs {
        position:              at,
        time:                  now + road.current_segment().travel_time(at - position),
        level:                 run.car().level(),
        ttaf:                  forecast.ttaf,
        ttau:                  forecast.ttau,
        ttdf:                  driver.ttdf(),
        ttdu:                  driver.ttdu(),
        distraction:           0,
        fatigue:               0,
        uncorrectable_fatigue: driver.uncorrectable_fatigue(),
        request:               None,
        pending:               None,
        last_declines:         *driver.last_declines(),
        last_switch:           run.time_of_last_switch(),
    };
    let choice = choice_from(mediator.decide(sim, &inputs)?);

    let Ok(id) = choice.action.parse::<ActionId>() else {
        return Ok(None);
    };
    if !id.is_shift() || !sim.vocabulary().allows(id) {
        return Ok(None);
    }
    let id = id.clamped(cfg.maximum_automation_level);

    let budget = choice.args.time.filter(|t| *t > 0.0).unwrap_or(match id {
        ActionId::EnforceShift(_) => cfg.actions.min_esl_time,
        _ => cfg.preferences.comfortable_shift_time,
    });
    let shift = FutureShift {
        action: id,
        args:   choice.args,
        start:  at,
        end:    at + road.segment_at(at).travel_distance(budget),
    };

    if let Some(previous) = mediator.predicted(&id.to_string()) {
        if (previous.start - shift.start).abs() < REPEAT_DISTANCE
            || (previous.end - shift.start).abs() < REPEAT_DISTANCE
        {
            return Ok(None);
        }
    }
    mediator.remember(shift.clone());
    Ok(Some(shift))
}

/// Where the next shift decision is due: just before the next drop in the
/// nominal maximum level (leaving room for a comfortable shift), or for a
/// rise, no earlier than the decline cool-down and comfortable-switch
/// positions allow.
fn future_position(sim: &Sim) -> SimResult<f64> {
    let run = sim.current()?;
    let road = run.road();
    let forecaster = road.forecaster();
    let cfg = sim.config();
    let p = &cfg.preferences;
    let position = run.car().position();
    let now = run.time();

    let levels = forecaster.levels(Variant::Nominal);
    let index = forecaster.interval_index(position, Variant::Nominal);
    let current = levels[index].level;
    let next = levels.get(index + 1).map_or(current, |iv| iv.level);
    let mut change = levels[index].end;

    if next < current {
        let speed = forecaster
            .speeds()
            .iter()
            .find(|s| s.end >= change)
            .map_or(0.0, |s| s.speed);
        change -= (p.comfortable_shift_time + 2.0 * cfg.timestep) * speed / 3_600.0;
    }
    if next <= current {
        return Ok(position.max(change));
    }

    // Past the decline cool-down of every shiftable level.
    let mut decline = f64::MAX;
    for level in Level::FORECAST {
        if level > cfg.maximum_automation_level {
            continue;
        }
        match run.driver().last_decline(level) {
            Some(t) => {
                let remaining = (p.decline_threshold - (now - t)).max(0.0);
                decline = decline.min(road.position_in_time(position, remaining));
            }
            None => {
                decline = position;
                break;
            }
        }
    }
    if decline == f64::MAX {
        decline = position;
    }

    let comfortable = match run.time_of_last_switch() {
        Some(t) => road.position_in_time(position, (p.uncomfortable_switch - (now - t)).max(0.0)),
        None => position,
    };

    Ok(change.max(decline).max(comfortable))
}
