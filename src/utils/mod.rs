pub mod command;
pub mod format;
pub mod locker;
pub mod output;
pub mod redact;

// Re-export commonly used types (used by test crate)
pub use locker::{BackupLock, LockError};
pub use output::{Sink, Terminal};
pub use redact::{RedactError, RedactWriter, Redactor};
