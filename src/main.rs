//! Watchmaker CLI - Grow a being, evolve its walk, save the result.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use glam::DVec3;
use watchmaker::{SessionConfig, World};

/// Iterations per world step while growing.
const GROWTH_ITERATIONS: u64 = 50;
/// Iterations per population step while evolving.
const EVOLUTION_ITERATIONS: u64 = 30;
/// Give up on growth after this many steps.
const MAX_GROWTH_STEPS: usize = 100_000;

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [generations] [output]", args[0]);
        eprintln!();
        eprintln!("Grow a being and evolve its walk from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to session configuration file");
        eprintln!("  generations  Number of evolved generations (default: 10)");
        eprintln!("  output       Where to save the evolved being (default: being.wmk)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let generations: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(10);
    let output = args
        .get(3)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("being.wmk"));

    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let config: SessionConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    println!("Watchmaker");
    println!("==========");
    println!(
        "Population: {} (waves of {})",
        config.evolution.population_size, config.evolution.birth_wave_size
    );
    println!(
        "Lifespan: {}..{} iterations",
        config.evolution.min_lifespan, config.evolution.max_lifespan
    );
    println!("Generations: {}", generations);
    println!();

    let mut world = World::new(config).unwrap_or_else(|e| {
        eprintln!("Error creating world: {}", e);
        std::process::exit(1);
    });

    let id = match world.create_being("cli@watchmaker", "Hello, world", None, DVec3::Z) {
        Ok(being) => being.id().to_string(),
        Err(e) => {
            eprintln!("Error conceiving being: {}", e);
            std::process::exit(1);
        }
    };

    println!("Growing {}...", id);
    let start = Instant::now();
    let mut steps = 0;
    while world
        .being(&id)
        .is_some_and(|being| being.phase().is_growing())
    {
        world.experience_time(GROWTH_ITERATIONS);
        steps += 1;
        if steps > MAX_GROWTH_STEPS {
            eprintln!("Growth did not finish");
            std::process::exit(1);
        }
    }
    let Some(being) = world.being(&id) else {
        eprintln!("{} did not survive growth", id);
        std::process::exit(1);
    };
    println!(
        "  Born after {} steps ({:.2}s): {} joints, {} intervals",
        steps,
        start.elapsed().as_secs_f32(),
        being.body().joints().len(),
        being.body().intervals().len()
    );
    println!();

    println!("Evolving...");
    let start = Instant::now();
    let population = world.start_evolution(&id).unwrap_or_else(|e| {
        eprintln!("Error starting evolution: {}", e);
        std::process::exit(1);
    });
    for generation in 0..generations {
        let result = (|| {
            while population.experience_time(EVOLUTION_ITERATIONS)? {}
            let best = population.cull()?;
            let (travel, speed) = (best.travel_to_goal(), best.speed());
            let exhausted = population.advance_lifespan()?;
            Ok::<_, watchmaker::EvolutionError>((travel, speed, exhausted))
        })();
        match result {
            Ok((travel, speed, exhausted)) => {
                println!(
                    "  Generation {}/{}: travel={:.3}, speed={:.3}, lifespan={}",
                    generation + 1,
                    generations,
                    travel,
                    speed,
                    population.lifespan()
                );
                if exhausted {
                    println!("  Lifespan reached its maximum");
                    break;
                }
            }
            Err(e) => {
                eprintln!("Error evolving: {}", e);
                std::process::exit(1);
            }
        }
    }
    println!("  {}", population.progress());
    println!("Time: {:.2}s", start.elapsed().as_secs_f32());

    let being = world.adopt_evolution().unwrap_or_else(|e| {
        eprintln!("Error adopting genome: {}", e);
        std::process::exit(1);
    });
    if let Err(e) = being.save(&output) {
        eprintln!("Error saving being: {}", e);
        std::process::exit(1);
    }
    println!();
    println!("Saved {} to {}", being, output.display());
}

fn print_example_config() {
    let config = SessionConfig {
        random_seed: Some(42),
        ..Default::default()
    };

    println!("Example configuration (save as config.json):");
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|e| {
            eprintln!("Error serializing config: {}", e);
            std::process::exit(1);
        })
    );
}
