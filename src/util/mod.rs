//! Utility modules for migration-scout

pub mod logging;

pub use logging::{init_logging, LoggingConfig};
