//! File-based locking to prevent concurrent backup runs
//!
//! The lock is an advisory `flock`-style lock on a fixed path. The kernel drops
//! it when the holder dies, so a killed run never leaves a stale lock behind.

use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Delay between two acquisition attempts
pub const RETRY_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("failed to open lock file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to acquire lock {path:?} after {}", humantime::format_duration(*.timeout))]
    Timeout { path: PathBuf, timeout: Duration },

    #[error("failed to acquire lock {path:?}: {source}")]
    Acquire {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Lock file that serializes orchestration runs on one host
pub struct BackupLock {
    lock: RwLock<File>,
    path: PathBuf,
    timeout: Duration,
    retry_interval: Duration,
}

impl BackupLock {
    /// Open (or create) the lock file. Does not take the lock.
    pub fn open(path: impl Into<PathBuf>, timeout: Duration) -> Result<Self, LockError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| LockError::Open {
                path: path.clone(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Open {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            lock: RwLock::new(file),
            path,
            timeout,
            retry_interval: RETRY_INTERVAL,
        })
    }

    /// Override the polling interval
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` while holding the lock.
    ///
    /// Polls until the lock is free or the timeout elapses. The lock is
    /// released when `f` returns, whatever it returns.
    pub fn run<T, F: FnOnce() -> T>(&mut self, f: F) -> Result<T, LockError> {
        debug!(lockfile = ?self.path, timeout = ?self.timeout, "Attempting to acquire lock");
        let start = Instant::now();

        loop {
            match self.lock.try_write() {
                Ok(guard) => {
                    let mut held = Held {
                        guard,
                        path: &self.path,
                    };
                    if let Err(e) = held.write_pid() {
                        debug!(lockfile = ?self.path, "Failed to record pid in lock file: {}", e);
                    }
                    debug!(lockfile = ?self.path, "Acquired lock");
                    return Ok(f());
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if start.elapsed() >= self.timeout {
                        return Err(LockError::Timeout {
                            path: self.path.clone(),
                            timeout: self.timeout,
                        });
                    }
                    debug!(lockfile = ?self.path, "Waiting for other instance to finish");
                    thread::sleep(self.retry_interval);
                }
                Err(source) => {
                    return Err(LockError::Acquire {
                        path: self.path.clone(),
                        source,
                    })
                }
            }
        }
    }
}

/// Lock held for the duration of [`BackupLock::run`]
struct Held<'a> {
    guard: RwLockWriteGuard<'a, File>,
    path: &'a Path,
}

impl Held<'_> {
    fn write_pid(&mut self) -> io::Result<()> {
        self.guard.set_len(0)?;
        self.guard.seek(SeekFrom::Start(0))?;
        writeln!(self.guard, "{}", std::process::id())?;
        self.guard.flush()
    }
}

impl Drop for Held<'_> {
    fn drop(&mut self) {
        // Clear our pid before the kernel lock goes away with the guard
        match self.guard.set_len(0) {
            Ok(()) => debug!(lockfile = ?self.path, "Released lock"),
            Err(e) => warn!(lockfile = ?self.path, "Failed to release lock cleanly: {}", e),
        }
    }
}
