//! Subprocess implementation of [`Backend`]

use super::*;
use crate::config::{expand_tilde, BackendManifest};
use crate::utils::command::{exit_code, run_capturing_stdout, run_streamed, StdoutTo};
use crate::utils::output::Terminal;
use std::process::{self, ExitStatus};
use tracing::{debug, info_span};

/// Talks to one backend executable
pub struct BackendClient {
    manifest: BackendManifest,
    terminal: Terminal,
}

impl BackendClient {
    /// Look up `backend` and refuse it if it speaks another protocol version
    pub fn new(config: &Config, backend: &str, terminal: Terminal) -> Result<Self, ProtoError> {
        let manifest = config
            .backend(backend)
            .ok_or_else(|| ProtoError::UnknownBackend(backend.to_string()))?;

        if manifest.protocol_version != PROTOCOL_VERSION {
            return Err(ProtoError::UnsupportedProtocolVersion {
                backend: backend.to_string(),
                version: manifest.protocol_version,
            });
        }

        Ok(Self {
            manifest: manifest.clone(),
            terminal,
        })
    }

    pub fn manifest(&self) -> &BackendManifest {
        &self.manifest
    }

    fn command(&self, command: Command, env: EnvVars) -> process::Command {
        let mut cmd = process::Command::new(expand_tilde(&self.manifest.bin));
        cmd.env(ENV_COMMAND, command.as_str());
        cmd.envs(env);
        cmd
    }

    fn encode(
        command: Command,
        env: Result<EnvVars, serde_json::Error>,
    ) -> Result<EnvVars, ProtoError> {
        env.map_err(|source| ProtoError::Encode { command, source })
    }

    fn spawn_error(&self, source: std::io::Error) -> ProtoError {
        ProtoError::Spawn {
            backend: self.manifest.name.clone(),
            source,
        }
    }

    fn check(&self, command: Command, status: ExitStatus) -> Result<(), ProtoError> {
        if status.success() {
            return Ok(());
        }
        Err(ProtoError::Exited {
            backend: self.manifest.name.clone(),
            command,
            code: status.code(),
        })
    }

    /// Run with stdout and stderr streamed to ours
    fn run(&self, command: Command, env: EnvVars) -> Result<ExitStatus, ProtoError> {
        let _span = info_span!("backend", backend = %self.manifest.name, command = %command).entered();
        debug!(bin = ?self.manifest.bin, "Invoking backend");

        let mut cmd = self.command(command, env);
        run_streamed(&mut cmd, &self.terminal, StdoutTo::Stdout).map_err(|e| self.spawn_error(e))
    }
}

impl Backend for BackendClient {
    fn backup(&self, req: &BackupRequest) -> Result<(), ProtoError> {
        let env = Self::encode(Command::Backup, req.to_env())?;
        let status = self.run(Command::Backup, env)?;
        self.check(Command::Backup, status)
    }

    fn exec(&self, req: &ExecRequest) -> Result<i32, ProtoError> {
        let env = Self::encode(Command::Exec, req.to_env())?;
        let status = self.run(Command::Exec, env)?;
        Ok(exit_code(status))
    }

    fn list_backups(&self, req: &ListBackupsRequest) -> Result<ListBackupsResponse, ProtoError> {
        let command = Command::ListBackups;
        let env = Self::encode(command, req.to_env())?;

        let _span = info_span!("backend", backend = %self.manifest.name, command = %command).entered();
        debug!(bin = ?self.manifest.bin, "Invoking backend");

        let mut cmd = self.command(command, env);
        let (status, stdout) =
            run_capturing_stdout(&mut cmd, &self.terminal).map_err(|e| self.spawn_error(e))?;
        self.check(command, status)?;

        serde_json::from_slice(&stdout).map_err(|source| ProtoError::Decode {
            backend: self.manifest.name.clone(),
            command,
            source,
        })
    }

    fn restore(&self, req: &RestoreRequest) -> Result<(), ProtoError> {
        let env = Self::encode(Command::Restore, req.to_env())?;
        let status = self.run(Command::Restore, env)?;
        self.check(Command::Restore, status)
    }
}

/// Hands out [`BackendClient`]s sharing one terminal
#[derive(Clone, Debug)]
pub struct ProcessBackends {
    terminal: Terminal,
}

impl ProcessBackends {
    pub fn new(terminal: Terminal) -> Self {
        Self { terminal }
    }
}

impl BackendProvider for ProcessBackends {
    fn client(&self, config: &Config, backend: &str) -> Result<Box<dyn Backend>, ProtoError> {
        Ok(Box::new(BackendClient::new(config, backend, self.terminal.clone())?))
    }
}
