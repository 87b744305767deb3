//! Integration tests for md-sim.

use md_action::{ActionArgs, ActionCommand, ActionId};
use md_core::{Level, SimConfig};
use md_road::{PresetRoad, PresetSegment, RouteSample};
use md_rules::Value;

use crate::{Sim, SimBuilder, SimError};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Baseline scenario with deterministic action starts.
fn test_config() -> SimConfig {
    let mut cfg = SimConfig::baseline();
    cfg.random_start_in_woo = false;
    cfg
}

/// Baseline scenario without any road or driver events.
fn quiet_config() -> SimConfig {
    let mut cfg = test_config();
    cfg.road.static_events.clear();
    cfg.road.dynamic_events.clear();
    cfg.driver.events.clear();
    cfg
}

fn segment(road_type: &str, length: f64) -> PresetSegment {
    PresetSegment { road_type: road_type.to_owned(), length, speed: None }
}

fn highway(km: f64) -> PresetRoad {
    PresetRoad::default().with_segments(vec![segment("highway", km)])
}

fn sim_on(cfg: SimConfig, preset: PresetRoad) -> Sim {
    SimBuilder::new(cfg).preset(preset).build().unwrap()
}

fn nothing(sim: &mut Sim) -> crate::StepOutcome {
    sim.step(ActionCommand::NOTHING, ActionArgs::default()).unwrap()
}

// ── SimBuilder validation ─────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use super::*;

    #[test]
    fn builds_from_baseline() {
        let sim = SimBuilder::new(SimConfig::baseline()).build().unwrap();
        assert_eq!(sim.vocabulary().len(), 29);
        assert_eq!(sim.safety_kinds().len(), 7);
        assert!(!sim.is_done());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut cfg = test_config();
        cfg.timestep = 0.0;
        assert!(matches!(SimBuilder::new(cfg).build(), Err(SimError::Config(_))));
    }

    #[test]
    fn unknown_action_code_is_rejected() {
        let mut cfg = test_config();
        cfg.available_actions.push("SSL9".into());
        assert!(matches!(SimBuilder::new(cfg).build(), Err(SimError::Action(_))));
    }

    #[test]
    fn unknown_safety_predicate_is_rejected() {
        let mut cfg = test_config();
        cfg.safety_events.push("Speeding".into());
        assert!(matches!(SimBuilder::new(cfg).build(), Err(SimError::Safety(_))));
    }

    #[test]
    fn route_must_be_ordered_and_non_empty() {
        let empty = PresetRoad::default().with_route(Vec::new());
        assert!(matches!(SimBuilder::new(test_config()).preset(empty).build(), Err(SimError::Road(_))));

        let sample = |timestamp| RouteSample { timestamp, position_m: 0.0, speed: 0.0, ttaf: 0.0, ttau: 0.0 };
        let backwards = PresetRoad::default().with_route(vec![sample(1.0), sample(0.5)]);
        assert!(matches!(SimBuilder::new(test_config()).preset(backwards).build(), Err(SimError::Road(_))));
    }
}

// ── Reset / step contract ─────────────────────────────────────────────────────

#[cfg(test)]
mod step_tests {
    use super::*;
    use crate::TerminalReason;

    #[test]
    fn step_before_reset_errors() {
        let mut sim = sim_on(test_config(), highway(1.0));
        assert!(matches!(
            sim.step(ActionCommand::NOTHING, ActionArgs::default()),
            Err(SimError::NotReset)
        ));
        assert!(matches!(sim.snapshot(), Err(SimError::NotReset)));
    }

    #[test]
    fn reset_starts_at_origin() {
        let mut sim = sim_on(test_config(), highway(1.0));
        let snap = sim.reset(7).unwrap();
        assert_eq!(snap.seed, 7);
        assert_eq!(snap.tick.0, 0);
        assert_eq!(snap.time, 0.0);
        assert_eq!(snap.position, 0.0);
        assert_eq!(snap.level, Level::L0);
        assert_eq!(snap.total_distance, 1.0);
        assert!(snap.pending_action.is_none());
        assert!(!snap.is_done());
    }

    #[test]
    fn step_advances_clock_and_car() {
        let mut sim = sim_on(quiet_config(), highway(1.0));
        sim.reset(1).unwrap();
        let out = nothing(&mut sim);
        assert_eq!(out.snapshot.tick.0, 1);
        assert_eq!(out.snapshot.time, 1.0);
        assert!(out.snapshot.position > 0.0);
        assert!(out.snapshot.speed > 0.0);
        assert!(!out.done);
    }

    #[test]
    fn reset_next_counts_up_from_configured_seed() {
        let mut sim = sim_on(test_config(), highway(1.0));
        assert_eq!(sim.reset_next().unwrap().seed, 42);
        assert_eq!(sim.reset_next().unwrap().seed, 43);
        sim.reset(100).unwrap();
        assert_eq!(sim.reset_next().unwrap().seed, 101);
    }

    #[test]
    fn same_seed_same_run() {
        let mut a = sim_on(test_config(), highway(2.0));
        let mut b = sim_on(test_config(), highway(2.0));
        a.reset(9).unwrap();
        b.reset(9).unwrap();
        for _ in 0..30 {
            assert_eq!(nothing(&mut a), nothing(&mut b));
        }
    }

    #[test]
    fn driving_to_the_end_of_the_road_terminates() {
        let mut sim = sim_on(quiet_config(), highway(0.5));
        sim.reset(3).unwrap();
        let mut last = nothing(&mut sim);
        while !last.done {
            last = nothing(&mut sim);
        }
        assert_eq!(last.reason, Some(TerminalReason::EndOfRoad));
        assert!(last.snapshot.position >= 0.5);

        let metrics = sim.metrics().unwrap();
        assert!(metrics.finalized);
        assert!(!metrics.emergency_stop);
        assert_eq!(metrics.time_passed, last.snapshot.time);
        assert_eq!(metrics.time_in_level[Level::L0.index()], last.snapshot.time);

        assert!(matches!(
            sim.step(ActionCommand::NOTHING, ActionArgs::default()),
            Err(SimError::Terminated(TerminalReason::EndOfRoad))
        ));
    }

    #[test]
    fn instant_emergency_stop_ends_the_run() {
        let mut cfg = quiet_config();
        cfg.instant_actions = true;
        let mut sim = sim_on(cfg, highway(1.0));
        sim.reset(5).unwrap();
        let out = sim.step(ActionCommand::start(ActionId::EmergencyStop), ActionArgs::default()).unwrap();
        assert!(out.done);
        assert_eq!(out.reason, Some(TerminalReason::EmergencyStop));
        assert_eq!(out.snapshot.resolved_action.as_ref().map(|a| a.id), Some(ActionId::EmergencyStop));

        let metrics = sim.metrics().unwrap();
        assert!(metrics.emergency_stop);
        assert_eq!(metrics.action_count, 1);
        assert!(matches!(
            sim.step(ActionCommand::NOTHING, ActionArgs::default()),
            Err(SimError::Terminated(TerminalReason::EmergencyStop))
        ));
    }

    #[test]
    fn instant_enforced_shift_switches_level() {
        let mut cfg = quiet_config();
        cfg.instant_actions = true;
        let mut sim = sim_on(cfg, highway(1.0));
        sim.reset(5).unwrap();
        let out = sim.step_code("ESL3", ActionArgs::default()).unwrap();
        assert!(out.snapshot.switched);
        assert_eq!(out.snapshot.level, Level::L3);
        assert!(out.snapshot.time_of_last_switch.is_some());
        assert!(out.snapshot.pending_action.is_none());
        assert_eq!(sim.current().unwrap().finished_actions().len(), 1);

        let out = nothing(&mut sim);
        assert!(!out.snapshot.switched);
        assert_eq!(out.snapshot.level, Level::L3);
    }

    #[test]
    fn shift_targets_are_capped_at_maximum_level() {
        let mut cfg = quiet_config();
        cfg.instant_actions = true;
        cfg.maximum_automation_level = Level::L3;
        cfg.preferences.preferred_level = Level::L3;
        let mut sim = sim_on(cfg, highway(1.0));
        sim.reset(5).unwrap();
        let out = sim.step_code("ESL4", ActionArgs::default()).unwrap();
        assert_eq!(out.snapshot.level, Level::L3);
    }

    #[test]
    fn new_action_is_ignored_while_one_is_pending() {
        let mut sim = sim_on(quiet_config(), highway(1.0));
        sim.reset(2).unwrap();
        let out = sim.step_code("SSL3", ActionArgs::default()).unwrap();
        assert_eq!(out.snapshot.pending_action.as_ref().map(|a| a.id), Some(ActionId::SuggestShift(Level::L3)));
        assert_eq!(out.snapshot.last_action.as_ref().map(|a| a.id), Some(ActionId::SuggestShift(Level::L3)));

        let run = sim.current().unwrap();
        assert!(run.pending_action().is_some_and(|a| a.is_pending()));

        // The car has not moved past the start yet, so the suggestion is
        // still pending when ESL2 arrives.
        let out = sim.step_code("ESL2", ActionArgs::default()).unwrap();
        if let Some(pending) = &out.snapshot.pending_action {
            assert_ne!(pending.id, ActionId::EnforceShift(Level::L2));
        }
        assert!(out.snapshot.last_action.is_none());
    }

    #[test]
    fn cancel_drops_the_pending_action() {
        let mut sim = sim_on(quiet_config(), highway(1.0));
        sim.reset(2).unwrap();
        sim.step_code("SSL3", ActionArgs::default()).unwrap();
        let out = sim.step(ActionCommand::CANCEL, ActionArgs::default()).unwrap();
        assert!(out.snapshot.pending_action.is_none());
        assert!(out.snapshot.resolved_action.is_none());
    }

    #[test]
    fn state_exposes_flat_keys() {
        let mut sim = sim_on(quiet_config(), highway(1.0));
        sim.reset(2).unwrap();
        nothing(&mut sim);
        let state = sim.state().unwrap();
        assert_eq!(state["tick"], Value::Num(1.0));
        assert_eq!(state["current_level"], Value::Level(Level::L0));
        assert_eq!(state["road_length"], Value::Num(1.0));
        assert_eq!(state["pending_action"], Value::None);
        assert_eq!(state["done"], Value::Bool(false));
        for key in ["ttaf_l2", "ttau_l3", "ttau_l4", "ttdf", "ttdu", "fatigue"] {
            assert!(state.contains_key(key), "{key}");
        }
    }
}

// ── Vocabulary and reconciliation ─────────────────────────────────────────────

#[cfg(test)]
mod reconcile_tests {
    use super::*;
    use crate::Choice;

    #[test]
    fn unconfigured_commands_are_unavailable() {
        let mut cfg = quiet_config();
        cfg.available_actions = vec!["DN".into(), "SSL3".into()];
        let mut sim = sim_on(cfg, highway(1.0));
        sim.reset(1).unwrap();

        assert!(matches!(sim.step_code("ES", ActionArgs::default()), Err(SimError::Unavailable(c)) if c == "ES"));
        assert!(matches!(
            sim.step(ActionCommand::CANCEL, ActionArgs::default()),
            Err(SimError::Unavailable(c)) if c == "CANCEL"
        ));
        assert!(matches!(sim.step_index(99, ActionArgs::default()), Err(SimError::Unavailable(_))));
        assert_eq!(sim.reconcile(&Choice::new("ES")).unwrap(), ActionCommand::NOTHING);

        let out = sim.step_index(1, ActionArgs::default()).unwrap();
        assert_eq!(out.snapshot.last_action.map(|a| a.id), Some(ActionId::SuggestShift(Level::L3)));
    }

    #[test]
    fn unparseable_choice_becomes_nothing() {
        let mut sim = sim_on(quiet_config(), highway(1.0));
        sim.reset(1).unwrap();
        assert_eq!(sim.reconcile(&Choice::new("WARP")).unwrap(), ActionCommand::NOTHING);
        assert_eq!(sim.reconcile(&Choice::nothing()).unwrap(), ActionCommand::NOTHING);
    }

    #[test]
    fn reconcile_against_pending_action() {
        let mut sim = sim_on(quiet_config(), highway(1.0));
        sim.reset(1).unwrap();
        assert!(matches!(sim.reconcile(&Choice::new("CR")), Ok(ActionCommand { cancel: false, .. })));
        let ssl3 = ActionId::SuggestShift(Level::L3);
        sim.step(ActionCommand::start(ssl3), ActionArgs::default()).unwrap();

        // Same action: collapses to DN.
        assert_eq!(sim.reconcile(&Choice::new("SSL3")).unwrap(), ActionCommand::NOTHING);
        // Different action: replaces the pending one.
        assert_eq!(
            sim.reconcile(&Choice::new("SSL4")).unwrap(),
            ActionCommand::replace(ActionId::SuggestShift(Level::L4))
        );

        sim.step(ActionCommand::replace(ActionId::EmergencyStop), ActionArgs::default()).unwrap();
        let run = sim.current().unwrap();
        assert_eq!(run.pending_action().map(|a| a.id()), Some(ActionId::EmergencyStop));

        // DN while an emergency stop is pending cancels it.
        assert_eq!(sim.reconcile(&Choice::nothing()).unwrap(), ActionCommand::CANCEL);
        assert_eq!(sim.reconcile(&Choice::new("CF")).unwrap(), ActionCommand::replace(ActionId::CorrectFatigue));
    }

    #[test]
    fn rechoosing_a_started_action_keeps_its_deadline() {
        let mut sim = sim_on(quiet_config(), highway(2.0));
        sim.reset(1).unwrap();
        let args = ActionArgs::default().with_last(1.5);
        sim.step(ActionCommand::start(ActionId::SuggestShift(Level::L3)), args).unwrap();
        let pending = sim.current().unwrap().pending_action().map(|a| (a.start(), a.latest_start()));
        assert_eq!(pending, Some((0.0, 1.5)));

        // The car is past the start, so the new deadline is ignored.
        let choice = Choice::new("SSL3").with_args(ActionArgs::default().with_last(0.8));
        assert_eq!(sim.reconcile(&choice).unwrap(), ActionCommand::NOTHING);
        assert_eq!(sim.current().unwrap().pending_action().map(|a| a.latest_start()), Some(1.5));
    }
}

// ── Route replay ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod route_tests {
    use super::*;
    use crate::TerminalReason;
    use md_core::Variant;

    fn route() -> Vec<RouteSample> {
        [(0.0, 0.0), (1.0, 10.0), (2.0, 30.0), (4.0, 60.0)]
            .iter()
            .map(|&(timestamp, position_m)| RouteSample {
                timestamp,
                position_m,
                speed: 36.0,
                ttaf: 35.0,
                ttau: 0.0,
            })
            .collect()
    }

    #[test]
    fn replay_follows_samples_until_they_run_out() {
        let preset = highway(5.0).with_route(route());
        let mut sim = sim_on(quiet_config(), preset);
        sim.reset(1).unwrap();

        let positions: Vec<f64> = (0..3).map(|_| nothing(&mut sim).snapshot.position).collect();
        assert_eq!(positions, vec![0.0, 0.01, 0.03]);
        assert_eq!(sim.current().unwrap().time(), 4.0);

        let last = nothing(&mut sim);
        assert!(last.done);
        assert_eq!(last.reason, Some(TerminalReason::EndOfRoute));
        assert_eq!(last.snapshot.position, 0.06);
        assert_eq!(last.snapshot.speed, 36.0);
    }

    #[test]
    fn recorded_forecast_overrides_nominal_l2() {
        let mut cfg = quiet_config();
        cfg.use_parsed_tta_for_actions = true;
        let mut sim = sim_on(cfg, highway(5.0).with_route(route()));
        sim.reset(1).unwrap();
        nothing(&mut sim);

        let nominal = sim.current_forecast(Variant::Nominal).unwrap();
        assert_eq!(nominal.ttaf[0], 35.0);
        assert_eq!(nominal.ttau[0], 0.0);
        let road = sim.forecast(sim.current().unwrap().car().position(), Variant::Nominal).unwrap();
        assert_eq!(road.ttaf[0], 0.0);
    }
}

// ── Mediators and episodes ────────────────────────────────────────────────────

#[cfg(test)]
mod mediator_tests {
    use super::*;
    use crate::{run_episode, Mediator, NoopMediator, NoopObserver, TerminalReason, TreeMediator};

    fn two_part_road() -> PresetRoad {
        PresetRoad::default().with_segments(vec![segment("highway", 2.0), segment("city", 2.0)])
    }

    #[test]
    fn noop_mediator_drives_to_the_end() {
        let mut sim = sim_on(quiet_config(), highway(0.5));
        let metrics = run_episode(&mut sim, &mut NoopMediator, &mut NoopObserver, 11, false).unwrap();
        assert!(metrics.finalized);
        assert_eq!(metrics.seed, 11);
        assert_eq!(metrics.action_count, 0);
        assert_eq!(metrics.time_without_actions, metrics.time_passed);
        assert_eq!(sim.current().unwrap().done(), Some(TerminalReason::EndOfRoad));
    }

    #[test]
    fn tree_sees_derived_variables() {
        let mut sim = sim_on(quiet_config(), two_part_road());
        sim.reset(4).unwrap();
        let mediator = TreeMediator::from_source("t", "DN\n").unwrap();
        let inputs = mediator.inputs(&sim).unwrap();
        let state = mediator.decision_state(&sim, &inputs).unwrap();

        assert_eq!(state["current_level"], Value::Level(Level::L0));
        assert_eq!(state["preferred_level"], Value::Level(Level::L3));
        assert_eq!(state["moving_to_level"], Value::None);
        // L3 and L4 end with the highway after 60 s, too soon for a
        // comfortable switch; L2 lasts to the end of the road.
        assert_eq!(state["max_level_long"], Value::Level(Level::L2));
        assert_eq!(state["comfortable_switch"], Value::Bool(true));
        assert_eq!(state["ssl3_declined"], Value::Bool(false));
        assert_eq!(state["active_request"], Value::Bool(false));
        assert_eq!(state["driver_request"], Value::None);
        assert_eq!(state["ttau"], Value::None);
        assert_eq!(state["road_length"], Value::Num(4.0));
    }

    #[test]
    fn tree_choice_drives_the_run() {
        let src = "\
current_level
    L0: ESL2 => time=min_esl_time
    L2: DN
";
        let mut cfg = quiet_config();
        cfg.instant_actions = true;
        let mut sim = sim_on(cfg, highway(0.5));
        let mut mediator = TreeMediator::from_source("shift.tree", src).unwrap();

        sim.reset(8).unwrap();
        let choice = mediator.choose(&sim).unwrap();
        assert_eq!(choice.action, "ESL2");
        assert_eq!(choice.args.time, Some(10.0));

        let metrics = run_episode(&mut sim, &mut mediator, &mut NoopObserver, 8, false).unwrap();
        assert_eq!(metrics.action_count, 1);
        assert!(metrics.time_in_level[Level::L2.index()] > 0.0);
    }

    #[test]
    fn invalid_tree_source_is_an_error() {
        assert!(matches!(TreeMediator::from_source("t", "x\n    True: y\n"), Err(SimError::Rule(_))));
        assert!(matches!(TreeMediator::from_source("t", "WARP\n"), Err(SimError::Rule(_))));
    }

    #[test]
    fn next_shift_is_predicted_before_the_level_drop() {
        let mut sim = sim_on(quiet_config(), two_part_road());
        sim.reset(4).unwrap();
        let mut mediator = TreeMediator::from_source("t", "SSL2\n").unwrap();

        let shift = mediator.future_action(&sim).unwrap().unwrap();
        assert_eq!(shift.action, ActionId::SuggestShift(Level::L2));
        // Comfortable shift time plus two ticks at 120 km/h before km 2.
        assert!((shift.start - 1.6).abs() < 1e-9, "{}", shift.start);
        assert!(shift.end > shift.start && shift.end < 2.0);

        // The same prediction is not repeated.
        assert!(mediator.future_action(&sim).unwrap().is_none());
        assert_eq!(mediator.predictions()["SSL2"].len(), 1);

        mediator.reset();
        assert!(mediator.predictions().is_empty());
    }

    #[test]
    fn non_shift_choices_are_not_predicted() {
        let mut sim = sim_on(quiet_config(), two_part_road());
        sim.reset(4).unwrap();
        let mut mediator = TreeMediator::from_source("t", "CF\n").unwrap();
        assert!(mediator.future_action(&sim).unwrap().is_none());
    }
}

// ── Observers ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod observer_tests {
    use super::*;
    use crate::{run_episode, ChannelObserver, NoopMediator, ObserverMessage, TreeMediator};

    #[test]
    fn channel_observer_reports_every_tick() {
        let mut sim = sim_on(quiet_config(), highway(0.3));
        let (mut observer, rx) = ChannelObserver::new();
        let metrics = run_episode(&mut sim, &mut NoopMediator, &mut observer, 6, false).unwrap();
        drop(observer);

        let messages: Vec<ObserverMessage> = rx.iter().collect();
        assert!(matches!(messages.first(), Some(ObserverMessage::Reset(s)) if s.tick.0 == 0));
        assert!(matches!(messages.last(), Some(ObserverMessage::RunEnded(m)) if *m == metrics));

        let ticks: Vec<u64> = messages
            .iter()
            .filter_map(|m| match m {
                ObserverMessage::TickCompleted(r) => Some(r.tick.0),
                _ => None,
            })
            .collect();
        assert_eq!(ticks, (1..=ticks.len() as u64).collect::<Vec<_>>());
        assert_eq!(ticks.len() as f64, metrics.time_passed);
    }

    #[test]
    fn dropped_acknowledgements_stop_pausing() {
        let mut sim = sim_on(quiet_config(), highway(0.3));
        let (mut observer, rx, ack) = ChannelObserver::pausing(5);
        drop(ack);
        run_episode(&mut sim, &mut NoopMediator, &mut observer, 6, false).unwrap();
        assert!(rx.try_iter().any(|m| matches!(m, ObserverMessage::RunEnded(_))));
    }

    #[test]
    fn pausing_observer_waits_for_acknowledgement() {
        let mut sim = sim_on(quiet_config(), highway(0.3));
        let (mut observer, rx, ack) = ChannelObserver::pausing(1);
        let handle = std::thread::spawn(move || {
            run_episode(&mut sim, &mut NoopMediator, &mut observer, 6, false).unwrap()
        });

        let mut ticks = 0;
        for message in rx.iter() {
            match message {
                ObserverMessage::Reset(_) => {}
                ObserverMessage::TickCompleted(_) => {
                    ticks += 1;
                    ack.send(()).unwrap();
                }
                ObserverMessage::RunEnded(_) => {
                    ack.send(()).unwrap();
                    break;
                }
            }
        }
        let metrics = handle.join().unwrap();
        assert_eq!(ticks as f64, metrics.time_passed);
    }

    #[test]
    fn future_shifts_are_attached_when_requested() {
        let preset = PresetRoad::default().with_segments(vec![segment("highway", 2.0), segment("city", 0.5)]);
        let mut sim = sim_on(quiet_config(), preset);
        let mut mediator = TreeMediator::from_source("t", "DN\n").unwrap();
        let (mut observer, rx) = ChannelObserver::new();
        run_episode(&mut sim, &mut mediator, &mut observer, 6, true).unwrap();
        drop(observer);
        // A DN tree never predicts a shift.
        assert!(rx.iter().all(|m| !matches!(m, ObserverMessage::TickCompleted(r) if r.future.is_some())));
    }
}

// ── Batch statistics ──────────────────────────────────────────────────────────

#[cfg(test)]
mod stats_tests {
    use std::time::Duration;

    use md_safety::{SafetyKind, Severity};

    use super::*;
    use crate::{run_batch, seed_range, BatchStats, KindMetrics, NoopMediator, RunMetrics};

    fn run(seed: u64, time: f64, actions: u64, between: f64) -> RunMetrics {
        let mut m = RunMetrics::new(seed, 50.0);
        m.time_passed = time;
        m.time_in_level = [time / 2.0, time / 4.0, time / 4.0, 0.0];
        m.action_count = actions;
        m.total_time_between_actions = between;
        m.severity[Severity::Critical.index()].event_count = seed % 3;
        m.severity[Severity::Critical.index()].total_time = seed as f64;
        m.severity[Severity::Critical.index()].shortest = Some(seed as f64 / 2.0);
        m.severity[Severity::Critical.index()].longest = seed as f64;
        m.per_kind = vec![KindMetrics { kind: SafetyKind::CarUnfit, count: seed as usize, duration: 0.5 }];
        m.emergency_stop = seed == 2;
        m.finalized = true;
        m
    }

    #[test]
    fn merge_is_associative_and_commutative() {
        let a = BatchStats::from_run(&run(1, 100.0, 2, 8.0));
        let b = BatchStats::from_run(&run(2, 200.0, 4, 16.0));
        let c = BatchStats::from_run(&run(3, 400.0, 0, 0.0));

        let left = a.clone().merged(b.clone()).merged(c.clone());
        let right = a.clone().merged(b.clone().merged(c.clone()));
        assert_eq!(left, right);
        assert_eq!(a.clone().merged(b.clone()), b.clone().merged(a.clone()));
        assert_eq!(c.clone().merged(a.clone()).merged(b.clone()), left);

        assert_eq!(left.total_runs, 3);
        assert_eq!(left.runs.iter().map(|r| r.seed).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(left.emergency_stops, 1);
        assert_eq!(left.per_kind["CarUnfit"].count, 6);
    }

    #[test]
    fn severity_totals_track_extremes() {
        let stats = BatchStats::new()
            .merged(BatchStats::from_run(&run(1, 100.0, 0, 0.0)))
            .merged(BatchStats::from_run(&run(2, 100.0, 0, 0.0)))
            .merged(BatchStats::from_run(&run(3, 100.0, 0, 0.0)));
        let critical = &stats.severity[Severity::Critical.index()];
        assert_eq!(critical.active_runs, 2);
        assert_eq!(critical.total_events, 3);
        assert_eq!(critical.shortest, Some(0.5));
        assert_eq!(critical.longest, 3.0);
        assert_eq!(stats.severity[Severity::Misc.index()].shortest, None);
    }

    #[test]
    fn report_derives_averages() {
        let mut stats = BatchStats::new();
        stats.add_run(&run(1, 100.0, 2, 8.0));
        stats.add_run(&run(2, 300.0, 3, 16.0));
        let report = stats.report(Duration::from_millis(1500));

        assert_eq!(report.total_runs, 2);
        assert_eq!(report.runtime_secs, 1.5);
        assert_eq!(report.avg_driving_time, 200.0);
        assert_eq!(report.percentage_in_level, [50.0, 25.0, 25.0, 0.0]);
        assert_eq!(report.avg_action_count, 2.5);
        // 5 actions over 100 km.
        assert_eq!(report.action_frequency, 5.0);
        assert_eq!(report.avg_time_between_actions, 6.0);
        assert_eq!(report.severity.len(), 3);
        assert_eq!(report.severity[Severity::Critical.index()].avg_event_time, 1.0);
    }

    #[test]
    fn empty_report_has_no_divisions_by_zero() {
        let report = BatchStats::new().report(Duration::ZERO);
        assert_eq!(report.avg_driving_time, 0.0);
        assert_eq!(report.percentage_in_level, [0.0; 4]);
        assert_eq!(report.action_frequency, 0.0);
        assert_eq!(report.avg_time_between_actions, 0.0);
    }

    #[test]
    fn batch_runs_every_seed() {
        let seeds = seed_range(10, 4);
        assert_eq!(seeds, vec![10, 11, 12, 13]);
        let stats = run_batch(&quiet_config(), Some(&highway(0.3)), &seeds, || Ok(NoopMediator)).unwrap();
        assert_eq!(stats.total_runs, 4);
        assert_eq!(stats.runs.iter().map(|r| r.seed).collect::<Vec<_>>(), seeds);
        assert_eq!(stats.total_action_count, 0);
        assert!((stats.total_distance - 1.2).abs() < 1e-9);
    }

    #[test]
    fn batch_propagates_mediator_errors() {
        let result = run_batch(&quiet_config(), Some(&highway(0.3)), &[1, 2], || {
            crate::TreeMediator::from_source("t", "x\n    True: y\n")
        });
        assert!(matches!(result, Err(SimError::Rule(_))));
    }
}
