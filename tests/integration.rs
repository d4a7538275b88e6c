//! Integration tests for CHIRP

use chirp::analysis::{ReplicateSummary, RECORD_WIDTH};
use chirp::experiment::{simulate_and_save, BatchSpec, ParamPoint};
use chirp::{Arena, Cohort, Config, Tactic, World};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_full_simulation_cycle() {
    let config = Config::default();
    let cohort = Cohort::from_population(20, 0.5, 0.2);
    let mut world = World::new_with_seed(config, Arena::square(1000.0), cohort, 12345).unwrap();

    world.run(10);

    assert_eq!(world.time, 10);
    assert_eq!(world.population(), 20);
    assert!(world.verify_occupancy().is_ok());

    // A receiver can mate at most once per mating duration
    let duration = u64::from(world.config.timing.mating_duration);
    let receivers = world.receivers().count() as u64;
    assert!(world.total_matings() <= receivers * 10_u64.div_ceil(duration));

    for org in &world.organisms {
        assert!(org.movement.within_distance >= 0.0);
        assert!(org.movement.across_distance >= 0.0);
    }
}

#[test]
fn test_reproducibility() {
    let point = ParamPoint::new(0.3, 1.0, 0.5);
    let run = |seed| {
        let cohort = point.cohort(60);
        let arena = Arena::square(point.arena_side_cm(60));
        let mut world = World::new_with_seed(Config::default(), arena, cohort, seed).unwrap();
        world.run(72);
        world
    };

    let world1 = run(99999);
    let world2 = run(99999);

    assert_eq!(world1.total_matings(), world2.total_matings());
    assert_eq!(world1.landscape.len(), world2.landscape.len());
    for (a, b) in world1.organisms.iter().zip(&world2.organisms) {
        assert_eq!(a.patch, b.patch);
        assert_eq!(a.x, b.x);
        assert_eq!(a.y, b.y);
        assert_eq!(a.mate_count, b.mate_count);
    }
}

#[test]
fn test_tactics_partition_males() {
    let cohort = Cohort::from_population(100, 0.5, 0.4);
    let mut world = World::new_with_seed(Config::default(), Arena::square(1000.0), cohort, 777).unwrap();
    world.run(72);

    let counts = world.tactic_counts();
    assert_eq!(counts.iter().sum::<usize>(), 50);
    assert_eq!(counts[0], 20);

    // Bafflers never leave the spot they were placed on
    for (org, s) in world.signallers() {
        if s.lifetime_tactic() == Tactic::Baffler {
            assert_eq!(org.movement.within_steps + org.movement.across_steps, 0);
        }
    }
}

#[test]
fn test_cross_patch_movement() {
    let mut config = Config::default();
    config.movement.cross_patch_movement = true;
    config.movement.male_across_patch = 0.5;
    config.movement.female_across_patch = 0.5;
    config.habitat.adjacency_threshold = 2000.0;

    let cohort = Cohort::from_population(80, 0.5, 0.2);
    let mut world = World::new_with_seed(config, Arena::square(1000.0), cohort, 2024).unwrap();
    world.run(144);

    assert!(world.verify_occupancy().is_ok());
    assert_eq!(world.landscape.occupant_count(), 80);
}

#[test]
fn test_stats_tracking() {
    let mut config = Config::default();
    config.timing.night_length = 24;
    config.timing.decision_interval = 24;

    let cohort = Cohort::from_population(40, 0.5, 0.2);
    let mut world = World::new_with_seed(config, Arena::square(800.0), cohort, 33333).unwrap();
    world.run(96);

    assert_eq!(world.stats.time, 95);
    assert_eq!(world.stats_history.snapshots.len(), 4);

    let series = world.stats_history.matings_series();
    assert_eq!(series.len(), 4);
    assert_eq!(series[3].0, 72);
    assert!(series.windows(2).all(|w| w[0].1 <= w[1].1));
    assert!(series[3].1 <= world.total_matings());
}

#[test]
fn test_replicate_summary() {
    let point = ParamPoint::new(0.5, 1.0, 0.5);
    let cohort = point.cohort(100);
    let arena = Arena::square(point.arena_side_cm(100));
    let mut world = World::new_with_seed(Config::default(), arena, cohort, 4242).unwrap();
    world.run(72);

    let summary = ReplicateSummary::from_world(&world);
    let record = summary.record(point.parameters(100));
    assert_eq!(record.len(), RECORD_WIDTH);

    let female = summary.metric("total_female_success").unwrap();
    assert_eq!(female.count, 50);
    let expected = world.total_matings() as f64 / 50.0;
    assert!((female.mean - expected).abs() < 1e-9);

    // Proportions mated lie in [0, 1]
    for p in summary.proportion_mated {
        assert!((0.0..=1.0).contains(&p));
    }
}

#[test]
fn test_batch_csv() {
    let mut config = Config::default();
    config.timing.night_length = 24;
    config.timing.decision_interval = 24;

    let spec = BatchSpec {
        runs: 2,
        population: 40,
        nights: 1,
        base_seed: 11,
    };
    let points = [ParamPoint::new(0.2, 1.0, 0.5), ParamPoint::new(0.8, 2.0, 0.5)];
    let dir = tempdir().unwrap();

    let path = simulate_and_save(&config, &points, &spec, dir.path(), "3").unwrap();
    assert!(path.ends_with("output_40_individuals_array_3.csv"));

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 5);
    for line in &lines {
        assert_eq!(line.split(',').count(), RECORD_WIDTH);
    }
    assert!(lines[1].starts_with("0.2,1,0.5,40,"));
    assert!(lines[3].starts_with("0.8,2,0.5,20,"));
}

#[test]
fn test_invalid_batch_rejected() {
    let spec = BatchSpec {
        runs: 1,
        population: 0,
        nights: 1,
        base_seed: 0,
    };
    let dir = tempdir().unwrap();
    let points = [ParamPoint::new(0.2, 1.0, 0.5)];
    assert!(simulate_and_save(&Config::default(), &points, &spec, dir.path(), "0").is_err());
}
