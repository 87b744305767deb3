//! Unit tests for md-core primitives.

#[cfg(test)]
mod level {
    use crate::{Level, Variant};

    #[test]
    fn ordering() {
        assert!(Level::L0 < Level::L2);
        assert!(Level::L2 < Level::L3);
        assert!(Level::L3 < Level::L4);
        assert_eq!(Level::ALL.iter().max(), Some(&Level::L4));
    }

    #[test]
    fn increment_and_decrement_saturate() {
        assert_eq!(Level::L0.increment(), Level::L2);
        assert_eq!(Level::L4.increment(), Level::L4);
        assert_eq!(Level::L2.decrement(), Level::L0);
        assert_eq!(Level::L0.decrement(), Level::L0);
    }

    #[test]
    fn indices() {
        assert_eq!(Level::L0.index(), 0);
        assert_eq!(Level::L4.index(), 3);
        assert_eq!(Level::L0.forecast_index(), None);
        assert_eq!(Level::L3.forecast_index(), Some(1));
        assert!(Level::L3.is_automated());
        assert!(!Level::L2.is_automated());
    }

    #[test]
    fn parse_and_display() {
        assert_eq!("L3".parse::<Level>().unwrap(), Level::L3);
        assert_eq!(" L2 ".parse::<Level>().unwrap(), Level::L2);
        assert!("L1".parse::<Level>().is_err());
        assert_eq!(Level::L4.to_string(), "L4");
        assert_eq!(Variant::Pessimistic.to_string(), "pessimistic");
    }
}

#[cfg(test)]
mod time {
    use crate::{SimClock, Tick};

    #[test]
    fn tick_arithmetic() {
        let t = Tick(10);
        assert_eq!(t + 5, Tick(15));
        assert_eq!(t.offset(3), Tick(13));
        assert_eq!(Tick(15) - Tick(10), 5u64);
        assert_eq!(Tick(7).to_string(), "T7");
    }

    #[test]
    fn clock_advance() {
        let mut clock = SimClock::new(0.5);
        clock.advance();
        clock.advance();
        assert_eq!(clock.current_tick, Tick(2));
        assert!((clock.time_passed - 1.0).abs() < 1e-12);

        clock.advance_to(10.0);
        assert_eq!(clock.current_tick, Tick(3));
        assert_eq!(clock.time_passed, 10.0);
    }

    #[test]
    fn elapsed_hms() {
        let mut clock = SimClock::new(1.0);
        clock.advance_to(3_725.0);
        let (h, m, s) = clock.elapsed_hms();
        assert_eq!((h, m), (1, 2));
        assert!((s - 5.0).abs() < 1e-9);
    }
}

#[cfg(test)]
mod rng {
    use crate::{SimRng, Stream};

    #[test]
    fn streams_are_deterministic() {
        let mut a = SimRng::stream(7, Stream::Driver);
        let mut b = SimRng::stream(7, Stream::Driver);
        for _ in 0..100 {
            assert_eq!(a.unit(), b.unit());
        }
    }

    #[test]
    fn streams_are_independent() {
        let mut road = SimRng::stream(7, Stream::Road);
        let mut car = SimRng::stream(7, Stream::Car);
        let same = (0..32).filter(|_| road.unit() == car.unit()).count();
        assert!(same < 32);
    }

    #[test]
    fn uniform_tolerates_reversed_bounds() {
        let mut rng = SimRng::new(1);
        for _ in 0..1_000 {
            let x = rng.uniform(5.0, 2.0);
            assert!((2.0..=5.0).contains(&x), "got {x}");
        }
        assert_eq!(rng.uniform(3.0, 3.0), 3.0);
    }

    #[test]
    fn normal_with_invalid_deviation_returns_mean() {
        let mut rng = SimRng::new(1);
        assert_eq!(rng.normal(4.0, f64::NAN), 4.0);
    }

    #[test]
    fn choose_from_empty_slice() {
        let mut rng = SimRng::new(1);
        let empty: [u8; 0] = [];
        assert!(rng.choose(&empty).is_none());
        assert_eq!(rng.choose(&[9]), Some(&9));
    }
}

#[cfg(test)]
mod calibration {
    use crate::{gaussian_window, ndtri, probability_per_timestep, SimRng};

    #[test]
    fn per_timestep_round_trip() {
        for &(required, steps) in &[(0.9, 20.0), (0.5, 3600.0), (0.01, 7.0), (0.99, 1.0)] {
            let p = probability_per_timestep(steps, required);
            let cumulative = 1.0 - (1.0 - p).powf(steps);
            assert!((cumulative - required).abs() < 1e-9, "{required} over {steps}: {cumulative}");
        }
    }

    #[test]
    fn per_timestep_clamps_inputs() {
        assert!((probability_per_timestep(0.0, 0.3) - 0.3).abs() < 1e-12);
        assert!((probability_per_timestep(f64::INFINITY, 0.3) - 0.3).abs() < 1e-12);
        assert_eq!(probability_per_timestep(10.0, 1.5), 1.0);
        assert_eq!(probability_per_timestep(10.0, -0.5), 0.0);
    }

    #[test]
    fn ndtri_known_values() {
        assert!(ndtri(0.5).abs() < 1e-9);
        assert!((ndtri(0.975) - 1.959_963_985).abs() < 1e-6);
        assert!((ndtri(0.01) + 2.326_347_874).abs() < 1e-6);
        assert_eq!(ndtri(0.0), f64::NEG_INFINITY);
        assert_eq!(ndtri(1.0), f64::INFINITY);
        assert!(ndtri(f64::NAN).is_nan());
    }

    #[test]
    fn symmetric_window_is_centred() {
        let w = gaussian_window(1.0, 11.0, 0.9, 0.0);
        assert!((w.mean - 6.0).abs() < 1e-6);
        assert!(w.std_dev > 0.0);
    }

    #[test]
    fn window_covers_requested_probability() {
        let w = gaussian_window(1.0, 10.0, 0.8, -0.5);
        let mut rng = SimRng::new(99);
        let trials = 20_000;
        let inside = (0..trials)
            .map(|_| rng.normal(w.mean, w.std_dev))
            .filter(|t| (1.0..=10.0).contains(t))
            .count();
        let rate = inside as f64 / trials as f64;
        assert!((rate - 0.8).abs() < 0.02, "got {rate}");
    }

    #[test]
    fn negative_skew_moves_failures_before_start() {
        let w = gaussian_window(1.0, 10.0, 0.8, -0.5);
        let centred = gaussian_window(1.0, 10.0, 0.8, 0.0);
        assert!(w.mean < centred.mean);
    }
}

#[cfg(test)]
mod config {
    use crate::{ConfigError, DriverEventKind, Level, SimConfig, NEVER};

    #[test]
    fn baseline_validates() {
        SimConfig::baseline().validate().unwrap();
    }

    #[test]
    fn zero_timestep_rejected() {
        let mut cfg = SimConfig::baseline();
        cfg.timestep = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { field: "timestep", .. })));
    }

    #[test]
    fn city_is_required() {
        let mut cfg = SimConfig::baseline();
        cfg.road.road_types.retain(|t| t.name != "city");
        assert_eq!(cfg.validate(), Err(ConfigError::MissingRoadType("city".into())));
    }

    #[test]
    fn initial_level_above_maximum_rejected() {
        let mut cfg = SimConfig::baseline();
        cfg.maximum_automation_level = Level::L2;
        cfg.initial_level = Level::L3;
        cfg.preferences.preferred_level = Level::L2;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn probability_out_of_range_rejected() {
        let mut cfg = SimConfig::baseline();
        cfg.actions.suggested_shift_acceptance_probability[2] = 1.2;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn reversed_lengths_rejected() {
        let mut cfg = SimConfig::baseline();
        cfg.road.dynamic_events[0].min_length = 9.0;
        cfg.road.dynamic_events[0].max_length = 1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn ttd_lookups_clamp_state() {
        let cfg = SimConfig::baseline();
        assert_eq!(cfg.ttd.ttdu_distraction(Level::L0, 0), NEVER);
        assert_eq!(cfg.ttd.ttdu_distraction(Level::L0, 9), cfg.ttd.ttdu_distraction[0][3]);
        assert_eq!(cfg.ttd.ttdf_ndrt(4), cfg.ttd.ttdf_ndrt[4]);
    }

    #[test]
    fn driver_event_kind_names() {
        assert_eq!("DRIVER_REQUEST".parse::<DriverEventKind>().unwrap(), DriverEventKind::DriverRequest);
        assert_eq!(DriverEventKind::Ndrt.to_string(), "NDRT");
        assert!("SLEEP".parse::<DriverEventKind>().is_err());
    }
}
