//! # strata-core
//!
//! Core library for the Strata backup subsystem providing:
//! - A typed error taxonomy with retry classification
//! - Retry predicates for external schedulers
//! - Layered runtime configuration (defaults, YAML, environment)
//! - Time formatting, timeout contexts and small path helpers

pub mod config;
pub mod error;
pub mod retry;
pub mod utils;

pub use config::{ConfigLoader, RuntimeConfig};
pub use error::{Error, ErrorKind, Result};
pub use retry::{BackupErrorPredicate, RetryPredicate};

/// Version of strata-core
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
