//! Progress reports of an evolutionary population.

use serde::{Deserialize, Serialize};

/// Snapshot taken whenever the lifespan changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Lifespan changes so far.
    pub generation: usize,
    /// Current competitor lifespan in iterations.
    pub lifespan: u64,
    /// Mean speed of the competitors that finished their lifespan.
    pub average_speed: f64,
    /// Best speed among them.
    pub top_speed: f64,
    /// How many finished.
    pub finished: usize,
    /// Set when the ancestor was advanced and everyone rebooted.
    pub reseeded: bool,
}

impl EvolutionProgress {
    /// Gather speeds of finished competitors.
    pub fn measure(generation: usize, lifespan: u64, speeds: impl IntoIterator<Item = f64>) -> Self {
        let mut finished = 0;
        let mut sum = 0.0;
        let mut top_speed = 0.0f64;
        for speed in speeds {
            finished += 1;
            sum += speed;
            top_speed = top_speed.max(speed);
        }
        Self {
            generation,
            lifespan,
            average_speed: if finished == 0 { 0.0 } else { sum / finished as f64 },
            top_speed,
            finished,
            reseeded: false,
        }
    }
}

impl std::fmt::Display for EvolutionProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Gen {}: lifespan {}, speed avg {:.3} top {:.3} over {}{}",
            self.generation,
            self.lifespan,
            self.average_speed,
            self.top_speed,
            self.finished,
            if self.reseeded { " (reseeded)" } else { "" }
        )
    }
}
