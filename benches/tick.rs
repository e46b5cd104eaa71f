//! Benchmarks for the per-frame scene tick and its parts.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use connectors::config::ConnectorConfig;
use connectors::connector::restoring_impulse;
use connectors::prelude::*;

const DT: f32 = 1.0 / 60.0;

fn input() -> InputSample {
    InputSample::new(Vec2::new(0.2, -0.1), Viewport::new(10.0, 8.0))
}

fn scene_with(count: usize) -> SceneConfig {
    SceneConfig {
        connectors: (0..count)
            .map(|i| ConnectorConfig::new(["#a2cc89", "#80c8ef", "#ff4060"][i % 3], 0.5))
            .collect(),
        ..SceneConfig::default()
    }
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("scene_tick");

    for count in [12, 50, 200] {
        group.bench_with_input(BenchmarkId::new("settled", count), &count, |b, &count| {
            let mut runner = SceneRunner::new(scene_with(count)).unwrap();
            let input = input();
            for _ in 0..300 {
                runner.tick(&input, DT);
            }
            b.iter(|| black_box(runner.tick(&input, DT)))
        });
    }

    group.bench_function("stock_from_spawn", |b| {
        let input = input();
        b.iter_batched(
            || SceneRunner::new(SceneConfig::default()).unwrap(),
            |mut runner| {
                for _ in 0..10 {
                    runner.tick(&input, DT);
                }
                runner
            },
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_controllers(c: &mut Criterion) {
    let mut group = c.benchmark_group("controllers");

    group.bench_function("restoring_impulse", |b| {
        let p = Vec3::new(1.5, -2.0, 0.25);
        b.iter(|| black_box(restoring_impulse(black_box(p), 0.2)))
    });

    group.bench_function("color_animator", |b| {
        let mut animator = ColorAnimator::new(Color::WHITE, Color::rgb(0.1, 0.5, 0.9), 0.2);
        b.iter(|| black_box(animator.update(DT)))
    });

    group.bench_function("compose_stock_scene", |b| {
        let config = SceneConfig::default();
        b.iter(|| black_box(Scene::compose(&config).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_tick, bench_controllers);
criterion_main!(benches);
