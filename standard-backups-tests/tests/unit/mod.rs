//! Unit tests for standard-backups
//!
//! These tests exercise the library pieces in isolation: redaction,
//! configuration loading, protocol encoding, locking and formatting.

mod config;
mod format;
mod proto;
mod redact;
