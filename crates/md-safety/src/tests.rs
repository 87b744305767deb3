//! Unit tests for md-safety.

#[cfg(test)]
mod helpers {
    use md_core::Level;

    use crate::{SafetyInputs, Thresholds};

    pub const TH: Thresholds = Thresholds {
        timestep:               1.0,
        decline_threshold:      30.0,
        uncomfortable_switch:   60.0,
        comfortable_shift_time: 10.0,
    };

    /// A calm tick: fit driver, level within the road's maximum, no actions.
    pub fn calm<'a>(time: f64, position: f64) -> SafetyInputs<'a> {
        SafetyInputs {
            time,
            position,
            level:          Level::L2,
            road_max_level: Level::L3,
            ttdu:           120.0,
            ttdf:           30.0,
            request:        None,
            last_declines:  [None; 4],
            new_action:     None,
            resolved:       None,
            switched:       false,
        }
    }
}

#[cfg(test)]
mod registry {
    use md_core::SimConfig;

    use crate::{SafetyError, SafetyEvaluator, SafetyKind, Severity};

    #[test]
    fn names_round_trip() {
        for kind in SafetyKind::ALL {
            assert_eq!(kind.name().parse::<SafetyKind>().unwrap(), kind);
        }
        assert_eq!(SafetyKind::UnnecessaryEs.to_string(), "UnnecessaryES");
    }

    #[test]
    fn severities() {
        assert_eq!(SafetyKind::CarUnfit.severity(), Severity::Critical);
        assert_eq!(SafetyKind::RecentSwitch.severity(), Severity::Uncomfortable);
        assert_eq!(SafetyKind::PendingRequest.severity(), Severity::Misc);
        assert!(Severity::Critical > Severity::Uncomfortable);
    }

    #[test]
    fn unknown_name_is_rejected() {
        let mut cfg = SimConfig::baseline();
        cfg.safety_events.push("Speeding".into());
        assert_eq!(
            SafetyEvaluator::from_config(&cfg).unwrap_err(),
            SafetyError::UnknownKind("Speeding".into())
        );
    }

    #[test]
    fn baseline_enables_every_kind() {
        let evaluator = SafetyEvaluator::from_config(&SimConfig::baseline()).unwrap();
        assert_eq!(evaluator.kinds().len(), SafetyKind::ALL.len());
    }
}

#[cfg(test)]
mod predicates {
    use md_action::{ActionId, ActionSummary};
    use md_core::Level;

    use super::helpers::{calm, TH};
    use crate::{SafetyEvaluator, SafetyKind, Severity};

    fn evaluator() -> SafetyEvaluator {
        SafetyEvaluator::new(SafetyKind::ALL.to_vec(), TH)
    }

    fn summary(id: ActionId, outcome: bool, time_passed: f64) -> ActionSummary {
        ActionSummary {
            name: id.to_string(),
            id,
            start: 0.0,
            earliest_start: 0.0,
            latest_start: 0.0,
            end: 0.1,
            time_passed,
            steps_taken: 4,
            outcome: Some(outcome),
        }
    }

    #[test]
    fn calm_tick_opens_nothing() {
        let mut ev = evaluator();
        ev.step(&calm(0.0, 0.0));
        assert!(ev.events().is_empty());
        assert!(Severity::ALL.iter().all(|&s| !ev.severity_active(s)));
    }

    #[test]
    fn car_unfit_lasts_while_it_holds() {
        let mut ev = evaluator();
        let mut tick = calm(0.0, 0.0);
        tick.level = Level::L4;
        ev.step(&tick);
        tick.time = 1.0;
        tick.position = 0.01;
        ev.step(&tick);
        assert!(ev.is_active(SafetyKind::CarUnfit));
        assert_eq!(ev.events().len(), 1);

        let mut tick = calm(2.0, 0.02);
        tick.level = Level::L2;
        ev.step(&tick);
        assert!(!ev.is_active(SafetyKind::CarUnfit));

        let event = &ev.events()[0];
        assert_eq!(event.start, 0.0);
        assert_eq!(event.end, 0.02);
        assert_eq!(event.duration, 2.0);
        assert!(!event.pending);
        assert_eq!(ev.active_steps(Severity::Critical), 2);
    }

    #[test]
    fn one_open_event_per_kind() {
        let mut ev = evaluator();
        let mut tick = calm(0.0, 5.0);
        tick.ttdu = 0.0;
        for t in 0..5 {
            tick.time = f64::from(t);
            ev.step(&tick);
        }
        let unfit = ev.events().iter().filter(|e| e.kind == SafetyKind::DriverUnfit).count();
        assert_eq!(unfit, 1);
        // The car never moved.
        assert_eq!(ev.events()[0].duration, 0.0);
    }

    #[test]
    fn double_suggestion_within_threshold() {
        let mut ev = evaluator();
        let mut tick = calm(20.0, 1.0);
        tick.last_declines[Level::L3.index()] = Some(10.0);
        tick.new_action = Some(ActionId::SuggestShift(Level::L3));
        ev.step(&tick);
        assert!(ev.is_active(SafetyKind::DoubleSuggestion));

        // Closes once the car has moved.
        ev.step(&calm(21.0, 1.0));
        assert!(ev.is_active(SafetyKind::DoubleSuggestion));
        ev.step(&calm(22.0, 1.01));
        assert!(!ev.is_active(SafetyKind::DoubleSuggestion));

        let mut late = calm(45.0, 2.0);
        late.last_declines[Level::L3.index()] = Some(10.0);
        late.new_action = Some(ActionId::SuggestShift(Level::L3));
        ev.step(&late);
        assert!(!ev.is_active(SafetyKind::DoubleSuggestion));
    }

    #[test]
    fn recent_switch_uses_the_previous_switch() {
        let mut ev = evaluator();
        let mut tick = calm(5.0, 0.1);
        tick.switched = true;
        tick.new_action = Some(ActionId::SuggestShift(Level::L3));
        ev.step(&tick);
        assert!(!ev.is_active(SafetyKind::RecentSwitch));
        assert_eq!(ev.time_of_last_switch(), Some(5.0));

        let mut tick = calm(10.0, 0.2);
        tick.new_action = Some(ActionId::EnforceShift(Level::L2));
        ev.step(&tick);
        assert!(ev.is_active(SafetyKind::RecentSwitch));

        let mut tick = calm(80.0, 1.0);
        tick.new_action = Some(ActionId::EnforceShift(Level::L2));
        ev.step(&tick);
        assert!(!ev.is_active(SafetyKind::RecentSwitch));
    }

    #[test]
    fn quick_takeover_needs_a_successful_enforce() {
        let mut ev = evaluator();
        let quick = summary(ActionId::EnforceShift(Level::L0), true, 3.0);
        let mut tick = calm(0.0, 0.0);
        tick.resolved = Some(&quick);
        ev.step(&tick);
        assert!(ev.is_active(SafetyKind::QuickTakeover));

        let mut ev = evaluator();
        let failed = summary(ActionId::EnforceShift(Level::L0), false, 3.0);
        let slow = summary(ActionId::EnforceShift(Level::L0), true, 12.0);
        let suggested = summary(ActionId::SuggestShift(Level::L0), true, 3.0);
        for resolved in [&failed, &slow, &suggested] {
            let mut tick = calm(0.0, 0.0);
            tick.resolved = Some(resolved);
            ev.step(&tick);
        }
        assert!(ev.events().is_empty());
    }

    #[test]
    fn unnecessary_es_lasts_one_tick() {
        let mut ev = evaluator();
        let mut tick = calm(0.0, 0.0);
        tick.new_action = Some(ActionId::EmergencyStop);
        ev.step(&tick);
        assert!(ev.is_active(SafetyKind::UnnecessaryEs));
        ev.step(&calm(1.0, 0.0));
        assert!(!ev.is_active(SafetyKind::UnnecessaryEs));

        // Driver about to become unfit: the stop is justified.
        let mut tick = calm(2.0, 0.0);
        tick.new_action = Some(ActionId::EmergencyStop);
        tick.ttdu = 3.0;
        ev.step(&tick);
        assert!(!ev.is_active(SafetyKind::UnnecessaryEs));

        // Automated level with a driver fit right now.
        let mut tick = calm(3.0, 0.0);
        tick.new_action = Some(ActionId::EmergencyStop);
        tick.level = Level::L3;
        tick.ttdf = 0.0;
        ev.step(&tick);
        assert!(ev.is_active(SafetyKind::UnnecessaryEs));
    }

    #[test]
    fn pending_request_counts_misc_steps() {
        let mut ev = evaluator();
        let mut tick = calm(0.0, 0.0);
        tick.request = Some(Level::L3);
        for t in 0..3 {
            tick.time = f64::from(t);
            tick.position = f64::from(t) * 0.01;
            ev.step(&tick);
        }
        assert!(ev.severity_active(Severity::Misc));
        assert_eq!(ev.active_steps(Severity::Misc), 3);

        tick.level = Level::L3;
        ev.step(&tick);
        assert!(!ev.severity_active(Severity::Misc));
        assert_eq!(ev.active_steps(Severity::Misc), 3);
    }
}
