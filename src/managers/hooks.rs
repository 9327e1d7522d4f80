//! Recipe lifecycle hooks

use crate::config::{Hook, Shell};
use crate::utils::command::{describe_exit, run_streamed, StdoutTo};
use crate::utils::output::Terminal;
use std::fmt;
use std::process::Command;
use tracing::{debug, info};

/// Point in a backup run at which a hook fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Before,
    After,
    OnSuccess,
    OnFailure,
}

impl HookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::Before => "before",
            HookKind::After => "after",
            HookKind::OnSuccess => "on-success",
            HookKind::OnFailure => "on-failure",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("failed to start {shell}: {source}")]
    Spawn {
        shell: Shell,
        #[source]
        source: std::io::Error,
    },

    #[error("{shell} command {}", describe_exit(*.code))]
    Exited { shell: Shell, code: Option<i32> },
}

/// Runs hooks with their output sent to our stderr
#[derive(Clone, Debug)]
pub struct HookRunner {
    terminal: Terminal,
}

impl HookRunner {
    pub fn new(terminal: Terminal) -> Self {
        Self { terminal }
    }

    /// Run `<shell> -c <command>` and wait for it
    pub fn run(&self, kind: HookKind, hook: &Hook) -> Result<(), HookError> {
        info!(hook = %kind, shell = %hook.shell, "Running hook");
        debug!(hook = %kind, command = %hook.command, "Hook command");

        let mut cmd = Command::new(hook.shell.program());
        cmd.arg("-c").arg(&hook.command);

        let status = run_streamed(&mut cmd, &self.terminal, StdoutTo::Stderr).map_err(|source| {
            HookError::Spawn {
                shell: hook.shell,
                source,
            }
        })?;

        if !status.success() {
            return Err(HookError::Exited {
                shell: hook.shell,
                code: status.code(),
            });
        }

        debug!(hook = %kind, "Hook finished");
        Ok(())
    }
}
