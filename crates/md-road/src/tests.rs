//! Unit tests for md-road.

#[cfg(test)]
mod helpers {
    use md_core::{EventTypeConfig, Level, RoadTypeConfig, SimConfig, SimRng};

    use crate::{PresetEvent, PresetRoad, PresetSegment, Road};

    /// Baseline config plus a 100 km/h `plain` road type (L4) and a
    /// `works` static event type (L2, 50 km/h).  No random dynamic events.
    pub fn config() -> SimConfig {
        let mut cfg = SimConfig::baseline();
        cfg.road.road_types.push(RoadTypeConfig {
            name:            "plain".into(),
            speed_limit:     100.0,
            max_level:       Level::L4,
            min_length:      1.0,
            max_length:      50.0,
            max_occurrences: 1,
        });
        cfg.road.static_events.push(event_type("works", Level::L2, 50.0));
        cfg.road.dynamic_events.clear();
        cfg
    }

    pub fn event_type(name: &str, level: Level, speed: f64) -> EventTypeConfig {
        EventTypeConfig {
            name:            name.into(),
            probability:     1.0,
            min_length:      1.0,
            max_length:      2.0,
            default_level:   level,
            default_speed:   speed,
            max_occurrences: 1,
        }
    }

    pub fn segment(road_type: &str, length: f64) -> PresetSegment {
        PresetSegment { road_type: road_type.into(), length, speed: None }
    }

    pub fn event(name: &str, start: f64, end: f64) -> PresetEvent {
        PresetEvent { name: name.into(), start, end }
    }

    /// 10 km of `plain` road with road works lowering the level to L2 over
    /// [2, 5].
    pub fn works_road() -> Road {
        let preset = PresetRoad::default()
            .with_segments(vec![segment("plain", 10.0)])
            .with_static_events(vec![event("works", 2.0, 5.0)]);
        Road::new(&config(), Some(&preset), SimRng::new(1)).unwrap()
    }
}

#[cfg(test)]
mod generator {
    use md_core::{ConfigError, SimConfig, SimRng};

    use super::helpers::{config, segment};
    use crate::{generate_segments, segments_from_preset, RoadError};

    #[test]
    fn random_roads_start_and_end_in_city() {
        let cfg = SimConfig::baseline();
        for seed in 0..50 {
            let mut rng = SimRng::new(seed);
            let segments = generate_segments(&cfg.road, &mut rng).unwrap();
            let first = &segments[0];
            let last = &segments[segments.len() - 1];
            assert_eq!(first.road_type, "city");
            assert_eq!(first.start, 0.0);
            assert_eq!(last.road_type, "city");
            assert_eq!(last.end, cfg.road.road_length);
        }
    }

    #[test]
    fn random_roads_are_contiguous_and_alternate() {
        let cfg = SimConfig::baseline();
        for seed in 0..50 {
            let mut rng = SimRng::new(seed);
            let segments = generate_segments(&cfg.road, &mut rng).unwrap();
            for pair in segments.windows(2) {
                assert!((pair[0].end - pair[1].start).abs() < 1e-9, "gap in seed {seed}: {pair:?}");
                assert_ne!(pair[0].road_type, pair[1].road_type, "repeat in seed {seed}");
                assert!(pair[0].length() > 0.0);
            }
        }
    }

    #[test]
    fn highway_is_wrapped_by_links_and_capped() {
        let cfg = SimConfig::baseline();
        for seed in 0..50 {
            let mut rng = SimRng::new(seed);
            let segments = generate_segments(&cfg.road, &mut rng).unwrap();
            let highways: Vec<usize> = segments
                .iter()
                .enumerate()
                .filter(|(_, s)| s.road_type == "highway")
                .map(|(i, _)| i)
                .collect();
            assert!(highways.len() <= 1);
            for i in highways {
                assert_eq!(segments[i - 1].road_type, "highway_link");
                assert_eq!(segments[i + 1].road_type, "highway_link");
            }
        }
    }

    #[test]
    fn preset_segments_are_laid_end_to_end() {
        let cfg = config();
        let mut fast = segment("plain", 4.0);
        fast.speed = Some(130.0);
        let segments = segments_from_preset(&cfg.road, &[segment("city", 1.5), fast]).unwrap();
        assert_eq!(segments[0].end, 1.5);
        assert_eq!(segments[1].start, 1.5);
        assert_eq!(segments[1].end, 5.5);
        assert_eq!(segments[0].speed_limit, 50.0);
        assert_eq!(segments[1].speed_limit, 130.0);
    }

    #[test]
    fn unknown_preset_type_rejected() {
        let cfg = config();
        let err = segments_from_preset(&cfg.road, &[segment("canal", 1.0)]).unwrap_err();
        assert!(matches!(err, RoadError::Config(ConfigError::UnknownRoadType(t)) if t == "canal"));
    }

    #[test]
    fn empty_preset_rejected() {
        let cfg = config();
        assert!(matches!(segments_from_preset(&cfg.road, &[]), Err(RoadError::Empty)));
    }
}

#[cfg(test)]
mod events {
    use md_core::{Level, SimConfig, SimRng, Variant};

    use super::helpers::{config, event, event_type};
    use crate::{generate_segments, generate_static_events, EventKind, RoadEvent, RoadEventGenerator};

    #[test]
    fn variant_levels_are_ordered() {
        for level in Level::ALL {
            let e = RoadEvent::new("x", EventKind::Static, 0.0, 1.0, level, 50.0);
            assert!(e.level(Variant::Pessimistic) <= e.level(Variant::Nominal));
            assert!(e.level(Variant::Nominal) <= e.level(Variant::Optimistic));
        }
        let e = RoadEvent::new("x", EventKind::Static, 0.0, 1.0, Level::L2, 50.0);
        assert_eq!(e.pessimistic, Level::L0);
        assert_eq!(e.optimistic, Level::L3);
    }

    #[test]
    fn at_most_one_static_event_per_eligible_segment() {
        let mut cfg = SimConfig::baseline();
        cfg.road.static_events = vec![event_type("works", Level::L2, 50.0), event_type("school", Level::L0, 30.0)];
        for seed in 0..20 {
            let mut rng = SimRng::new(seed);
            let segments = generate_segments(&cfg.road, &mut rng).unwrap();
            let events = generate_static_events(&cfg.road, &segments, None, &mut rng);

            let eligible: Vec<_> = segments[..segments.len() - 1].iter().filter(|s| !s.is_highway()).collect();
            assert_eq!(events.len(), eligible.len());
            for (e, s) in events.iter().zip(&eligible) {
                assert_eq!(e.name, "works");
                assert!(e.start >= s.start && e.end <= s.end, "{e:?} outside {s:?}");
                assert!(e.end >= e.start);
            }
        }
    }

    #[test]
    fn preset_static_events_skip_unknown_names() {
        let cfg = config();
        let mut rng = SimRng::new(1);
        let segments = generate_segments(&cfg.road, &mut rng).unwrap();
        let preset = [event("works", 5.0, 6.0), event("meteor", 1.0, 2.0), event("works", 2.0, 3.0)];
        let events = generate_static_events(&cfg.road, &segments, Some(&preset), &mut rng);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].start, 2.0);
        assert_eq!(events[0].max_speed, 50.0);
        assert_eq!(events[1].start, 5.0);
    }

    #[test]
    fn dynamic_events_respect_occurrence_cap() {
        let mut cfg = config();
        cfg.road.dynamic_events = vec![event_type("jam", Level::L0, 20.0)];
        let mut generator = RoadEventGenerator::new(&cfg.road, 1.0, 3_600.0, None);
        let mut rng = SimRng::new(3);

        let first = generator.next_dynamic(1.0, &[], &mut rng).unwrap();
        let lookahead = first.start - 1.0;
        assert!((1.0..=3.0).contains(&lookahead), "lookahead {lookahead}");
        assert!(first.end - first.start >= 1.0 && first.end - first.start <= 2.0);
        assert!(generator.next_dynamic(2.0, &[], &mut rng).is_none());
        assert_eq!(generator.counts().collect::<Vec<_>>(), vec![("jam", 1)]);
    }

    #[test]
    fn dynamic_events_skip_active_names() {
        let mut cfg = config();
        let mut jam = event_type("jam", Level::L0, 20.0);
        jam.max_occurrences = 5;
        cfg.road.dynamic_events = vec![jam];
        let mut generator = RoadEventGenerator::new(&cfg.road, 1.0, 3_600.0, None);
        let mut rng = SimRng::new(3);
        let active = [RoadEvent::new("jam", EventKind::Dynamic, 0.0, 2.0, Level::L0, 20.0)];
        assert!(generator.next_dynamic(1.0, &active, &mut rng).is_none());
    }

    #[test]
    fn preset_dynamic_events_are_announced_within_lookahead() {
        let mut cfg = config();
        cfg.road.dynamic_events = vec![event_type("jam", Level::L0, 20.0)];
        let preset = [event("jam", 4.0, 6.0)];
        let mut generator = RoadEventGenerator::new(&cfg.road, 1.0, 3_600.0, Some(&preset));
        let mut rng = SimRng::new(3);

        assert!(generator.next_dynamic(0.5, &[], &mut rng).is_none());
        let e = generator.next_dynamic(3.5, &[], &mut rng).unwrap();
        assert_eq!((e.start, e.end), (4.0, 6.0));
        assert_eq!(e.kind, EventKind::Dynamic);
        assert!(generator.next_dynamic(9.0, &[], &mut rng).is_none());
    }
}

#[cfg(test)]
mod forecast {
    use md_core::{Level, Variant, NEVER};

    use super::helpers::works_road;

    #[test]
    fn partitions_merge_equal_neighbours() {
        let road = works_road();
        let levels: Vec<_> = road
            .forecaster()
            .levels(Variant::Nominal)
            .iter()
            .map(|iv| (iv.level, iv.end))
            .collect();
        assert_eq!(levels, vec![(Level::L4, 2.0), (Level::L2, 5.0), (Level::L4, 10.0)]);
        let speeds: Vec<_> = road.forecaster().speeds().iter().map(|s| (s.speed, s.end)).collect();
        assert_eq!(speeds, vec![(100.0, 2.0), (50.0, 5.0), (100.0, 10.0)]);
    }

    #[test]
    fn forecast_before_the_works() {
        let road = works_road();
        let f = road.forecast(0.0, Variant::Nominal);
        assert_eq!(f.ttaf, [0.0, 0.0, 0.0]);
        assert_eq!(f.ttau, [NEVER, 72.0, 72.0]);
    }

    #[test]
    fn forecast_inside_the_works() {
        let road = works_road();
        let f = road.forecast(3.0, Variant::Nominal);
        // 2 km at 50 km/h to the end of the works
        assert_eq!(f.ttaf, [0.0, 144.0, 144.0]);
        assert_eq!(f.ttau, [NEVER, 0.0, 0.0]);

        let optimistic = road.forecast(3.0, Variant::Optimistic);
        assert_eq!(optimistic.ttaf, [0.0, 0.0, 144.0]);

        let pessimistic = road.forecast(3.0, Variant::Pessimistic);
        assert_eq!(pessimistic.ttaf, [144.0, 144.0, 144.0]);
        assert_eq!(pessimistic.ttau, [0.0, 0.0, 0.0]);
        assert_eq!(road.forecast(0.0, Variant::Pessimistic).ttau, [72.0, 72.0, 72.0]);
    }

    #[test]
    fn ttaf_zero_iff_level_available() {
        let road = works_road();
        let forecaster = road.forecaster();
        for variant in Variant::ALL {
            for step in 0..100 {
                let p = step as f64 * 0.1;
                let available = forecaster.level_at(p, variant);
                let ttaf = forecaster.ttaf(p, variant).unwrap();
                for (i, level) in Level::FORECAST.iter().enumerate() {
                    assert_eq!(ttaf[i] == 0.0, available >= *level, "{variant} at {p}");
                }
            }
        }
    }

    #[test]
    fn variants_are_ordered_pointwise() {
        let road = works_road();
        let forecaster = road.forecaster();
        for step in 0..=100 {
            let p = step as f64 * 0.1;
            let pessimistic = forecaster.level_at(p, Variant::Pessimistic);
            let nominal = forecaster.level_at(p, Variant::Nominal);
            let optimistic = forecaster.level_at(p, Variant::Optimistic);
            assert!(pessimistic <= nominal && nominal <= optimistic, "at {p}");
        }
    }

    #[test]
    fn travel_time_integration() {
        let road = works_road();
        assert_eq!(road.time_to_position(0.0, 10.0), 468.0);
        assert_eq!(road.time_to_position(3.0, 4.0), 72.0);
        assert_eq!(road.time_to_position(4.0, 3.0), 0.0);
        assert_eq!(road.time_to_position(0.0, 11.0), NEVER);
        assert!((road.position_in_time(0.0, 144.0) - 3.0).abs() < 1e-9);
        assert_eq!(road.position_in_time(0.0, 10_000.0), 10.0);
        assert_eq!(road.position_in_time(12.0, 5.0), 12.0);
    }

    #[test]
    fn forecast_past_the_end_is_frozen() {
        let mut road = works_road();
        road.step(9.9);
        let last = road.forecast(9.9, Variant::Nominal);
        road.step(10.4);
        assert!(road.forecaster().forecast(10.4, Variant::Nominal).is_none());
        assert_eq!(road.forecast(10.4, Variant::Nominal), last);
    }
}

#[cfg(test)]
mod road {
    use md_core::{Level, SimConfig, SimRng, Variant};

    use super::helpers::{config, event, event_type, segment, works_road};
    use crate::{PresetRoad, Road};

    #[test]
    fn totals() {
        let preset = PresetRoad::default().with_segments(vec![segment("city", 5.0), segment("plain", 10.0)]);
        let road = Road::new(&config(), Some(&preset), SimRng::new(1)).unwrap();
        assert_eq!(road.total_distance(), 15.0);
        // 5 km at 50 km/h + 10 km at 100 km/h
        assert_eq!(road.estimated_total_time(), 720.0);
    }

    #[test]
    fn step_tracks_segment_and_max_level() {
        let preset = PresetRoad::default()
            .with_segments(vec![segment("city", 1.0), segment("plain", 10.0)])
            .with_static_events(vec![event("works", 4.0, 6.0)]);
        let mut road = Road::new(&config(), Some(&preset), SimRng::new(1)).unwrap();

        road.step(0.5);
        assert_eq!(road.current_segment().road_type, "city");
        assert_eq!(road.current_max_level(), Level::L2);

        road.step(2.0);
        assert_eq!(road.current_segment().road_type, "plain");
        assert_eq!(road.current_max_level(), Level::L4);

        road.step(5.0);
        assert_eq!(road.current_max_level(), Level::L2);
        assert_eq!(road.active_events().len(), 1);
        assert_eq!(road.target_speed(), 50.0);

        road.step(6.5);
        assert!(road.active_events().is_empty());
        assert_eq!(road.target_speed(), 100.0);
    }

    #[test]
    fn segment_boundary_counts_as_previous_level() {
        let mut road = works_road();
        road.step(2.0);
        assert_eq!(road.current_max_level(), Level::L4);
        road.step(2.01);
        assert_eq!(road.current_max_level(), Level::L2);
    }

    #[test]
    fn dynamic_event_insertion_rebuilds_forecast() {
        let mut cfg = config();
        cfg.road.dynamic_events = vec![event_type("jam", Level::L0, 20.0)];
        let preset = PresetRoad::default()
            .with_segments(vec![segment("plain", 10.0)])
            .with_dynamic_events(vec![event("jam", 4.0, 6.0)]);
        let mut road = Road::new(&cfg, Some(&preset), SimRng::new(1)).unwrap();
        assert_eq!(road.forecaster().level_at(5.0, Variant::Nominal), Level::L4);

        assert!(road.step(0.5).is_none());
        let inserted = road.step(3.5).unwrap();
        assert_eq!(inserted.name, "jam");
        assert_eq!(road.events().len(), 1);
        assert_eq!(road.forecaster().level_at(5.0, Variant::Nominal), Level::L0);

        road.step(4.5);
        assert_eq!(road.target_speed(), 20.0);
    }

    #[test]
    fn random_roads_build() {
        let cfg = SimConfig::baseline();
        for seed in 0..10 {
            let road = Road::new(&cfg, None, SimRng::new(seed)).unwrap();
            assert_eq!(road.total_distance(), cfg.road.road_length);
            assert!(road.estimated_total_time() > 0.0);
            for pair in road.events().windows(2) {
                assert!(pair[0].start <= pair[1].start);
            }
        }
    }
}

#[cfg(test)]
mod preset {
    use std::io::{Cursor, Write};

    use md_core::{DriverEventKind, Level};

    use crate::{
        load_driver_events_reader, load_events_reader, load_route_csv, load_segments_reader, PresetRoad, RoadError,
    };

    #[test]
    fn segments_with_optional_speed() {
        let csv = "road_type,length,speed\ncity,3.5,\nhighway,42.0,110\n";
        let segments = load_segments_reader(Cursor::new(csv)).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].speed, None);
        assert_eq!(segments[1].speed, Some(110.0));

        let preset = PresetRoad::default().with_segments(segments);
        assert_eq!(preset.road_length(), Some(45.5));
    }

    #[test]
    fn empty_segment_file_rejected() {
        let csv = "road_type,length,speed\n";
        assert!(matches!(load_segments_reader(Cursor::new(csv)), Err(RoadError::Empty)));
    }

    #[test]
    fn events() {
        let csv = "name,start,end\nroad_works, 2.0, 5.0\n";
        let events = load_events_reader(Cursor::new(csv)).unwrap();
        assert_eq!(events[0].name, "road_works");
        assert_eq!(events[0].end, 5.0);
    }

    #[test]
    fn driver_events_parse_kind_and_level() {
        let csv = "kind,position,level\nDISTRACTION,1.5,\nDRIVER_REQUEST,12.0,L3\n";
        let events = load_driver_events_reader(Cursor::new(csv)).unwrap();
        assert_eq!(events[0].kind, DriverEventKind::Distraction);
        assert_eq!(events[0].level, None);
        assert_eq!(events[1].kind, DriverEventKind::DriverRequest);
        assert_eq!(events[1].level, Some(Level::L3));
    }

    #[test]
    fn bad_driver_event_kind_rejected() {
        let csv = "kind,position,level\nSNEEZE,1.5,\n";
        assert!(matches!(load_driver_events_reader(Cursor::new(csv)), Err(RoadError::Config(_))));
    }

    #[test]
    fn malformed_row_is_a_parse_error() {
        let csv = "name,start,end\nroad_works,two,5.0\n";
        assert!(matches!(load_events_reader(Cursor::new(csv)), Err(RoadError::Parse(_))));
    }

    #[test]
    fn route_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timestamp,position_m,speed,ttaf,ttau").unwrap();
        writeln!(file, "0.0,0.0,0.0,35.0,0.0").unwrap();
        writeln!(file, "1.0,12.5,45.0,34.0,0.0").unwrap();
        let route = load_route_csv(file.path()).unwrap();
        assert_eq!(route.len(), 2);
        assert_eq!(route[1].position_m, 12.5);
        assert_eq!(route[1].speed, 45.0);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_route_csv(std::path::Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, RoadError::Io(_)));
    }
}
