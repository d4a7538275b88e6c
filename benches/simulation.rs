//! Performance benchmarks for CHIRP

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use chirp::experiment::{run_replicate, ParamPoint};
use chirp::perception::listen;
use chirp::{Arena, Config, World};

fn benchmark_world_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");
    let point = ParamPoint::new(0.2, 1.0, 0.5);

    for population in [100, 500, 1000].iter() {
        let arena = Arena::square(point.arena_side_cm(*population));
        let mut world =
            World::new_with_seed(Config::default(), arena, point.cohort(*population), 42).unwrap();

        // Warm up
        world.run(10);

        group.bench_with_input(
            BenchmarkId::new("population", population),
            population,
            |b, _| {
                b.iter(|| {
                    world.step();
                });
            },
        );
    }

    group.finish();
}

fn benchmark_listen(c: &mut Criterion) {
    let point = ParamPoint::new(0.2, 1.0, 0.5);
    let arena = Arena::square(point.arena_side_cm(500));
    let mut world = World::new_with_seed(Config::default(), arena, point.cohort(500), 42).unwrap();
    // Land on a step where males are calling
    world.run(5);

    let receiver = world.receivers().map(|(org, _)| org.id).next().unwrap();
    let org = &world.organisms[receiver];

    c.bench_function("receiver_listen", |b| {
        b.iter(|| {
            listen(
                black_box(org),
                &world.organisms,
                &world.landscape,
                &world.config.acoustics,
            )
        });
    });
}

fn benchmark_replicate(c: &mut Criterion) {
    let config = Config::default();
    let point = ParamPoint::new(0.2, 1.0, 0.5);
    let night = u64::from(config.timing.night_length);

    c.bench_function("replicate_one_night_500", |b| {
        b.iter(|| run_replicate(&config, black_box(&point), 500, night, 7).unwrap());
    });
}

criterion_group!(
    benches,
    benchmark_world_step,
    benchmark_listen,
    benchmark_replicate,
);

criterion_main!(benches);
