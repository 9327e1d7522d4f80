//! Command tests for standard-backups
//!
//! These tests drive the orchestration engine and the protocol client
//! against generated script backends.

mod exec;
mod list_backups;
mod restore;
