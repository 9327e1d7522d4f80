//! Backend-side half of the protocol
//!
//! A backend written in Rust implements [`BackendHandler`] and calls [`run`]
//! from its `main`.

use super::*;
use anyhow::Result;
use std::io::Write;

/// One method per protocol command. Unimplemented commands are rejected.
pub trait BackendHandler {
    fn backup(&mut self, _req: BackupRequest) -> Result<()> {
        Err(ProtoError::Unhandled(Command::Backup).into())
    }

    /// Returns the exit code for the process
    fn exec(&mut self, _req: ExecRequest) -> Result<i32> {
        Err(ProtoError::Unhandled(Command::Exec).into())
    }

    fn list_backups(&mut self, _req: ListBackupsRequest) -> Result<ListBackupsResponse> {
        Err(ProtoError::Unhandled(Command::ListBackups).into())
    }

    fn restore(&mut self, _req: RestoreRequest) -> Result<()> {
        Err(ProtoError::Unhandled(Command::Restore).into())
    }
}

/// Decode the request named by `STANDARD_BACKUPS_COMMAND` and dispatch it.
///
/// `list-backups` responses are written to `stdout` as JSON. Returns the
/// exit code the backend process should end with.
pub fn execute<H, F, W>(handler: &mut H, lookup: F, stdout: &mut W) -> Result<i32>
where
    H: BackendHandler + ?Sized,
    F: Fn(&str) -> Option<String>,
    W: Write,
{
    let command: Command = require_env(&lookup, ENV_COMMAND)?.parse()?;

    match command {
        Command::Backup => {
            handler.backup(BackupRequest::from_env(lookup)?)?;
            Ok(0)
        }
        Command::Exec => handler.exec(ExecRequest::from_env(lookup)?),
        Command::ListBackups => {
            let response = handler.list_backups(ListBackupsRequest::from_env(lookup)?)?;
            serde_json::to_writer(&mut *stdout, &response)?;
            writeln!(stdout)?;
            stdout.flush()?;
            Ok(0)
        }
        Command::Restore => {
            handler.restore(RestoreRequest::from_env(lookup)?)?;
            Ok(0)
        }
    }
}

/// Serve one request from the process environment, then exit
pub fn run<H: BackendHandler + ?Sized>(handler: &mut H) -> ! {
    let mut stdout = std::io::stdout().lock();
    let code = match execute(handler, |name| std::env::var(name).ok(), &mut stdout) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    std::process::exit(code)
}
