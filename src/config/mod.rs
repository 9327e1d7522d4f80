//! Configuration module for standard-backups
//!
//! This module handles loading, resolving and validating configuration from a
//! TOML file.
//!
//! ## Loading order
//!
//! 1. Parse the document (hook shells are checked here)
//! 2. Resolve secrets from literals or files
//! 3. Substitute `{{ secrets.NAME }}` inside destination options
//! 4. Validate names and cross references
//!
//! ## Example Usage
//!
//! ```no_run
//! use standard_backups::config;
//!
//! let config = config::load_config("/etc/standard-backups/config.toml")?;
//!
//! for (name, job) in &config.jobs {
//!     println!("Job: {}, Destinations: {:?}", name, job.backup_to);
//! }
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{
    apply_secret_templates, check_backend_binaries, load_config, parse_config, resolve_secrets,
    validate_config, ConfigError, Result, ValidationIssue,
};
pub use types::*;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/standard-backups/config.toml";

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
