//! Test utilities for standard-backups
//!
//! This crate provides shared builders, script backend fixtures and a test
//! context with a captured terminal.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{recording_backend, ConfigBuilder, TestContext};
//!
//! #[test]
//! fn my_test() {
//!     let ctx = TestContext::new();
//!     let bin = recording_backend(ctx.temp_dir(), "dump");
//!     let config = ConfigBuilder::minimal(&bin).build();
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::{ConfigBuilder, HookSlot};
pub use fixtures::*;
pub use test_context::{ResultAssertions, TestContext};

// Re-export types from the main crate for convenience
pub use standard_backups::config::{Config, Hook, Shell};
pub use standard_backups::managers::backup::{BackupError, BackupManager, RunFailure};
pub use standard_backups::proto::{BackupRecord, ListBackupsResponse};

