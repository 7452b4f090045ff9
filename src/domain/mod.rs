//! Domain layer for fixloop
//!
//! This module contains the data model, error taxonomy and port traits.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{InfrastructureError, RoundError, RunnerError, StageError};
