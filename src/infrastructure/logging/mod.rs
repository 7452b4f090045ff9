//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty console output on stderr
//! - Optional daily-rotated JSON log files

pub mod config;
pub mod logger;

pub use config::{parse_log_level, LogFormat, LogSettings};
pub use logger::LoggerImpl;
