//! Watchmaker - Beings grown from bit-stream genes, evolved to walk.
//!
//! Every decision a being makes is read from a named gene: how its trunk
//! branches, where its limbs go, how its muscles swing for each direction it
//! may face. Genes are extended on demand from shared, replayable noise, so a
//! genome plus a seed fully determines a being.
//!
//! # Architecture
//!
//! - `genetics`: bit-stream genes, genomes and noise
//! - `fabric`: the tensile body that buds open, merge and relax
//! - `body`: energy, growth buds and the being life cycle
//! - `evolution`: populations of clones competing to reach a goal
//! - `world`: a session stepping many beings on a planet
//! - `schema`: configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use watchmaker::{World, schema::SessionConfig};
//! use glam::DVec3;
//!
//! let mut world = World::new(SessionConfig::default()).unwrap();
//! let id = world
//!     .create_being("me@example.com", "hello", None, DVec3::Z)
//!     .unwrap()
//!     .id()
//!     .to_string();
//! while world.being(&id).is_some_and(|being| being.phase().is_growing()) {
//!     world.experience_time(50);
//! }
//!
//! let population = world.start_evolution(&id).unwrap();
//! while population.experience_time(30).unwrap() {}
//! println!("Best trip: {:.2}", population.cull().unwrap().travel_to_goal());
//! world.adopt_evolution().unwrap();
//! ```

mod codec;

pub mod body;
pub mod evolution;
pub mod fabric;
pub mod genetics;
pub mod schema;
pub mod terrain;
pub mod world;

// Re-export commonly used types
pub use body::{Being, BeingBlob, BeingError, Direction, Embryo, Energy, Phase, Target};
pub use evolution::{Competitor, EvolutionError, EvolutionProgress, EvolutionaryPopulation};
pub use genetics::{Gene, GeneKey, GeneticsError, Genome, Noise, NoiseSeed, PseudoNoise};
pub use schema::{EvolutionConfig, LifeConfig, PhysicsConfig, SessionConfig};
pub use world::{World, WorldError};
