//! Backend plugin protocol
//!
//! A backend is a separate executable invoked once per operation. The
//! command and every request field travel as `STANDARD_BACKUPS_*`
//! environment variables; results come back as the exit status and, for
//! `list-backups`, a JSON document on stdout.

pub mod backup;
pub mod client;
pub mod exec;
pub mod list_backups;
pub mod mock;
pub mod restore;
pub mod server;

pub use backup::BackupRequest;
pub use client::{BackendClient, ProcessBackends};
pub use exec::ExecRequest;
pub use list_backups::{BackupRecord, ListBackupsRequest, ListBackupsResponse};
pub use restore::RestoreRequest;

use crate::config::Config;
use crate::utils::command::describe_exit;
use std::fmt;
use std::str::FromStr;

/// The only protocol version this build speaks
pub const PROTOCOL_VERSION: u32 = 1;

/// Separator for list-valued fields such as paths and excludes
pub const PATH_DELIMITER: char = ':';

pub const ENV_COMMAND: &str = "STANDARD_BACKUPS_COMMAND";
pub const ENV_PATHS: &str = "STANDARD_BACKUPS_PATHS";
pub const ENV_EXCLUDE: &str = "STANDARD_BACKUPS_EXCLUDE";
pub const ENV_DESTINATION_NAME: &str = "STANDARD_BACKUPS_DESTINATION_NAME";
pub const ENV_JOB_NAME: &str = "STANDARD_BACKUPS_JOB_NAME";
pub const ENV_OPTIONS: &str = "STANDARD_BACKUPS_OPTIONS";
pub const ENV_ARGS: &str = "STANDARD_BACKUPS_ARGS";
pub const ENV_BACKUP_ID: &str = "STANDARD_BACKUPS_BACKUP_ID";
pub const ENV_OUTPUT_DIR: &str = "STANDARD_BACKUPS_OUTPUT_DIR";

/// Environment variables encoding one request
pub type EnvVars = Vec<(&'static str, String)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Backup,
    Exec,
    ListBackups,
    Restore,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Backup => "backup",
            Command::Exec => "exec",
            Command::ListBackups => "list-backups",
            Command::Restore => "restore",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backup" => Ok(Command::Backup),
            "exec" => Ok(Command::Exec),
            "list-backups" => Ok(Command::ListBackups),
            "restore" => Ok(Command::Restore),
            other => Err(ProtoError::UnknownCommand(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    #[error("unknown backend {0}")]
    UnknownBackend(String),

    #[error("backend {backend} speaks protocol version {version}, expected {}", PROTOCOL_VERSION)]
    UnsupportedProtocolVersion { backend: String, version: u32 },

    #[error("failed to encode {command} request: {source}")]
    Encode {
        command: Command,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to run backend {backend}: {source}")]
    Spawn {
        backend: String,
        #[source]
        source: std::io::Error,
    },

    #[error("backend {backend} {} during {command}", describe_exit(*.code))]
    Exited {
        backend: String,
        command: Command,
        code: Option<i32>,
    },

    #[error("failed to decode {command} response from backend {backend}: {source}")]
    Decode {
        backend: String,
        command: Command,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),

    #[error("required environment variable {0} has an empty value")]
    EmptyEnv(&'static str),

    #[error("invalid value in environment variable {name}: {source}")]
    InvalidEnv {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown command {0}")]
    UnknownCommand(String),

    #[error("unhandled command {0}")]
    Unhandled(Command),
}

/// The capabilities every backend offers
pub trait Backend {
    fn backup(&self, req: &BackupRequest) -> Result<(), ProtoError>;

    /// Returns the backend's exit code
    fn exec(&self, req: &ExecRequest) -> Result<i32, ProtoError>;

    fn list_backups(&self, req: &ListBackupsRequest) -> Result<ListBackupsResponse, ProtoError>;

    fn restore(&self, req: &RestoreRequest) -> Result<(), ProtoError>;
}

/// Creates a [`Backend`] for a configured backend name
pub trait BackendProvider: Send + Sync {
    fn client(&self, config: &Config, backend: &str) -> Result<Box<dyn Backend>, ProtoError>;
}

/// Read a variable that must be present and non-empty
pub(crate) fn require_env<F>(lookup: &F, name: &'static str) -> Result<String, ProtoError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Err(ProtoError::MissingEnv(name)),
        Some(value) if value.is_empty() => Err(ProtoError::EmptyEnv(name)),
        Some(value) => Ok(value),
    }
}

/// Decode a JSON-valued variable that must be present and non-empty
pub(crate) fn require_json_env<F, T>(lookup: &F, name: &'static str) -> Result<T, ProtoError>
where
    F: Fn(&str) -> Option<String>,
    T: serde::de::DeserializeOwned,
{
    let raw = require_env(lookup, name)?;
    serde_json::from_str(&raw).map_err(|source| ProtoError::InvalidEnv { name, source })
}

pub(crate) fn join_list(items: &[String]) -> String {
    items.join(&PATH_DELIMITER.to_string())
}

pub(crate) fn split_list(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split(PATH_DELIMITER).map(str::to_string).collect()
}
