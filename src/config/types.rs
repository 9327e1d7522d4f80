use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::loader::ConfigError;

/// Backend-opaque destination options
pub type Options = serde_json::Map<String, serde_json::Value>;

pub const DEFAULT_LOCKFILE: &str = "/var/run/standard-backups.lock";
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub secrets: BTreeMap<String, SecretConfig>,
    #[serde(default)]
    pub backends: BTreeMap<String, BackendManifest>,
    #[serde(default)]
    pub recipes: BTreeMap<String, Recipe>,
    #[serde(default)]
    pub destinations: BTreeMap<String, Destination>,
    #[serde(default)]
    pub jobs: BTreeMap<String, Job>,

    /// Resolved secret values, keyed by secret name
    #[serde(skip)]
    pub secret_values: BTreeMap<String, String>,
}

impl Config {
    pub fn backend(&self, name: &str) -> Option<&BackendManifest> {
        self.backends.get(name)
    }

    pub fn recipe(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name)
    }

    pub fn destination(&self, name: &str) -> Option<&Destination> {
        self.destinations.get(name)
    }

    pub fn job(&self, name: &str) -> Option<&Job> {
        self.jobs.get(name)
    }

    /// Every resolved secret value, for registration with the redactor
    pub fn secret_values(&self) -> impl Iterator<Item = &str> {
        self.secret_values.values().map(String::as_str)
    }
}

/// Global settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Lock file guarding backup runs
    #[serde(default)]
    pub lockfile: Option<PathBuf>,
    #[serde(default)]
    pub lock_timeout_seconds: Option<u64>,

    /// Logging configuration
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub log_directory: Option<PathBuf>,
    #[serde(default = "default_log_max_files")]
    pub log_max_files: u32,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            lockfile: None,
            lock_timeout_seconds: None,
            log_level: None,
            log_directory: None,
            log_max_files: default_log_max_files(),
        }
    }
}

/// Where a secret value comes from
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SecretConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_file: Option<PathBuf>,
}

/// Description of a backend executable
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BackendManifest {
    #[serde(skip)]
    pub name: String,
    pub bin: PathBuf,
    pub protocol_version: u32,
    #[serde(default)]
    pub description: String,
}

/// What to back up and which hooks surround it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Recipe {
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub paths: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(flatten)]
    pub hooks: HookSet,
}

/// Lifecycle hooks of a recipe
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct HookSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Hook>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Hook>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success: Option<Hook>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<Hook>,
}

/// Shell command run at a lifecycle point
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Hook {
    pub shell: Shell,
    pub command: String,
}

impl Hook {
    pub fn new(shell: Shell, command: impl Into<String>) -> Self {
        Self {
            shell,
            command: command.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Shell {
    Sh,
    Bash,
}

impl Shell {
    /// Program to invoke, always called as `<program> -c <command>`
    pub fn program(&self) -> &'static str {
        match self {
            Shell::Sh => "sh",
            Shell::Bash => "bash",
        }
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

impl FromStr for Shell {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sh" => Ok(Shell::Sh),
            "bash" => Ok(Shell::Bash),
            other => Err(ConfigError::UnsupportedShell(other.to_string())),
        }
    }
}

impl TryFrom<String> for Shell {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Named backup target: a backend plus its options
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Destination {
    #[serde(skip)]
    pub name: String,
    pub backend: String,
    #[serde(default)]
    pub options: Options,
}

/// Binding of one recipe to one or more destinations
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Job {
    #[serde(skip)]
    pub name: String,
    pub recipe: String,
    pub backup_to: Vec<String>,
}

fn default_log_max_files() -> u32 { 10 }
