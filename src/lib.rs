//! Standard Backups Library
//!
//! Backup orchestration over pluggable backend executables: recipes say what
//! to back up, destinations say where, jobs bind the two.

pub mod config;
pub mod managers;
pub mod proto;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, Config};
pub use managers::backup::{BackupError, BackupManager, RunFailure};
pub use managers::logging::{init_logging, LogGuard, LoggingConfig};
pub use utils::{BackupLock, Redactor, Terminal};
