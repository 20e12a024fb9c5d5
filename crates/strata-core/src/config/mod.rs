//! Runtime configuration
//!
//! Operational knobs for the backup core: default log-archive piece
//! switching cadence, catalog text-column bound used by the list codecs,
//! and the default timeout for scheduling contexts.

mod loader;
mod runtime;

pub use loader::{ConfigLoader, RUNTIME_CONFIG_FILENAME};
pub use runtime::{ArchiveConfig, CodecConfig, RuntimeConfig, TimeoutConfig, MAX_LONGTEXT_LENGTH};
