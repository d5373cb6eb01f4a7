//! Quick evolution performance test

use std::rc::Rc;
use std::time::Instant;

use watchmaker::{
    Being, Embryo, EvolutionConfig, EvolutionaryPopulation, Genome, LifeConfig, NoiseSeed,
    PhysicsConfig, PseudoNoise, body::Speech, fabric::Physics, genetics::shared, terrain::Dry,
};

fn grown(seed: u64) -> Being {
    let noise = shared(PseudoNoise::from_seed(NoiseSeed::from_u64(seed)));
    let embryo = Embryo::new("PERF", "perf@watchmaker", Speech::new("perf"), Genome::new(Some(noise)), None)
        .unwrap_or_else(|e| panic!("embryo: {e}"));
    let mut being = Being::create(embryo, Rc::new(LifeConfig::default()));
    let physics = Physics::new(PhysicsConfig::default(), 50);
    let mut terrain = Dry;
    while being.phase().is_growing() {
        being
            .experience_time(&physics, &mut terrain)
            .unwrap_or_else(|e| panic!("growth: {e}"));
    }
    being
}

fn main() {
    println!("=== Evolution Performance Test ===\n");

    let start = Instant::now();
    let ancestor = grown(42);
    println!(
        "Grown in {:.2}s: {} joints, {} intervals\n",
        start.elapsed().as_secs_f64(),
        ancestor.body().joints().len(),
        ancestor.body().intervals().len()
    );

    // Test different population sizes
    for population_size in [8, 16, 24, 48] {
        println!("Population: {}", population_size);

        let config = EvolutionConfig {
            population_size,
            birth_wave_size: population_size / 3,
            min_lifespan: 1800,
            max_lifespan: 7200,
            ..Default::default()
        };
        let noise = shared(PseudoNoise::from_seed(NoiseSeed::from_u64(7)));
        let mut population =
            EvolutionaryPopulation::new(&ancestor, config, PhysicsConfig::default(), noise)
                .unwrap_or_else(|e| panic!("population: {e}"));

        let start = Instant::now();
        let mut steps = 0u64;
        let mut best = 0.0;
        for _ in 0..5 {
            while population
                .experience_time(30)
                .unwrap_or_else(|e| panic!("evolution: {e}"))
            {
                steps += 1;
            }
            best = population
                .cull()
                .unwrap_or_else(|e| panic!("cull: {e}"))
                .travel_to_goal();
            if population
                .advance_lifespan()
                .unwrap_or_else(|e| panic!("lifespan: {e}"))
            {
                break;
            }
        }
        let elapsed = start.elapsed();

        println!("  Steps:          {}", steps);
        println!("  Elapsed:        {:.2}s", elapsed.as_secs_f64());
        println!("  Steps/sec:      {:.1}", steps as f64 / elapsed.as_secs_f64());
        println!("  Best travel:    {:.4}", best);
        println!("  {}", population.progress());
        println!();
    }
}
