//! Benchmarks for growth and locomotion.

use std::rc::Rc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use glam::DVec3;
use watchmaker::{
    Being, Embryo, Genome, LifeConfig, NoiseSeed, PhysicsConfig, PseudoNoise,
    body::Speech,
    fabric::Physics,
    genetics::shared,
    terrain::Dry,
};

fn embryo(seed: u64) -> Embryo {
    let genome = Genome::new(Some(shared(PseudoNoise::from_seed(NoiseSeed::from_u64(seed)))));
    Embryo::new("BNCH", "bench@watchmaker", Speech::new("bench"), genome, None)
        .unwrap_or_else(|e| panic!("embryo: {e}"))
}

fn grow(being: &mut Being, physics: &Physics) {
    let mut terrain = Dry;
    while being.phase().is_growing() {
        being
            .experience_time(physics, &mut terrain)
            .unwrap_or_else(|e| panic!("growth: {e}"));
    }
}

fn bench_growth(c: &mut Criterion) {
    let mut group = c.benchmark_group("growth");
    group.sample_size(10);

    for iterations in [25, 50, 100] {
        let physics = Physics::new(PhysicsConfig::default(), iterations);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{} iterations/step", iterations)),
            &iterations,
            |b, _| {
                b.iter(|| {
                    let mut being = Being::create(embryo(1), Rc::new(LifeConfig::default()));
                    grow(&mut being, &physics);
                    black_box(being.body().joints().len())
                });
            },
        );
    }

    group.finish();
}

fn bench_adult_step(c: &mut Criterion) {
    let physics = Physics::new(PhysicsConfig::default(), 30);
    let mut being = Being::create(embryo(2), Rc::new(LifeConfig::default()));
    grow(&mut being, &physics);
    being.set_virtual(true);
    let mut terrain = Dry;

    c.bench_function("adult_step", |b| {
        b.iter(|| {
            being
                .experience_time(&physics, black_box(&mut terrain))
                .unwrap_or_else(|e| panic!("step: {e}"));
            black_box(being.geometry().body_center() != DVec3::ZERO)
        });
    });
}

criterion_group!(benches, bench_growth, bench_adult_step);
criterion_main!(benches);
