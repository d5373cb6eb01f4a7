//! Genes, genomes and the randomness that grows them.

mod gene;
mod genome;
mod noise;

pub use gene::{Gene, GeneReader, ScanId, bits_for};
pub use genome::{GeneKey, Genome, MOVEMENT_PREFIX, Scan};
pub use noise::{Noise, NoiseSeed, PseudoNoise, SharedNoise, shared};

/// Failures while decoding or mutating genes.
#[derive(Debug, thiserror::Error)]
pub enum GeneticsError {
    #[error("Gene {0} is exhausted and has no noise attached")]
    Exhausted(String),
    #[error("No genes start with {0:?}")]
    NoCandidates(String),
    #[error("Gene {0} has no noise to mutate with")]
    Detached(String),
}
