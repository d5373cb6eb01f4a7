//! Beings and everything they are grown from.

mod being;
mod bud;
mod direction;
mod embryo;
mod energy;
mod geometry;
mod record;
mod speech;

pub use being::{Being, Phase, Target};
pub use bud::{BudState, BudStep, Branched, Branching, GrowthBud, branch};
pub use direction::Direction;
pub use embryo::Embryo;
pub use energy::Energy;
pub use geometry::Geometry;
pub use record::{BEING_MAGIC, BEING_VERSION, BeingBlob};
pub use speech::Speech;

use crate::fabric::FaceId;
use crate::genetics::GeneticsError;

/// Failures while a being grows or lives.
#[derive(Debug, thiserror::Error)]
pub enum BeingError {
    #[error(transparent)]
    Genetics(#[from] GeneticsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Opened face {0:?} carries no trunk bud")]
    UnknownBud(FaceId),
}

#[cfg(test)]
pub(crate) use being::tests as test_support;
