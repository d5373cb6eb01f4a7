//! Evolutionary search for better walking.
//!
//! - **Fitness** (`fitness`): trip-to-goal scoring and ranking
//! - **Population** (`population`): competitors, culling, birth waves and lifespans
//! - **Progress** (`progress`): reports on every lifespan change

mod fitness;
mod population;
mod progress;

pub use fitness::{Bearing, Trip, rank_ascending, retain_best, trip_to_goal};
pub use population::{Competitor, EvolutionaryPopulation};
pub use progress::EvolutionProgress;

use crate::body::{BeingError, Phase};

/// Failures of an evolutionary population.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("Population has no competitors left")]
    EmptyPopulation,
    #[error("Only adults can evolve, not a being in {0:?}")]
    NotAdult(Phase),
    #[error(transparent)]
    Being(#[from] BeingError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
