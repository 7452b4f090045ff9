//! Infrastructure layer module
//!
//! - Configuration management
//! - Logging infrastructure
//! - Run history storage

pub mod config;
pub mod history;
pub mod logging;
