//! Minimal tensile fabric that beings grow into.
//!
//! Just enough mechanics to grow, settle and wiggle: joints and intervals
//! with ramping ideal lengths, faces to open, queued transformations, and a
//! relaxation integrator.

mod blob;
mod physics;
mod structure;
mod transform;

pub use blob::{FABRIC_MAGIC, FABRIC_VERSION, FabricBlob};
pub use physics::Physics;
pub use structure::{Chirality, Fabric, FabricEvent, Face, FaceId, Interval, Joint, Role, Span};
pub use transform::{OpenUp, Transformation};
