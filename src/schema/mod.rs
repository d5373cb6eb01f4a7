//! Schema module - Configuration types for growth, physics and evolution.

mod config;

pub use config::*;
