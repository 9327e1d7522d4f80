//! In-process backends that record calls and return configured results
//!
//! Available to external test crates as well as the unit tests.

use super::*;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One recorded backend invocation
#[derive(Clone, Debug, PartialEq)]
pub struct MockCall {
    pub backend: String,
    pub command: Command,
    pub destination: String,
    /// Only set for backup calls
    pub job: Option<String>,
    pub paths: Vec<String>,
    pub exclude: Vec<String>,
    pub args: Vec<String>,
}

impl MockCall {
    fn new(backend: &str, command: Command, destination: &str) -> Self {
        Self {
            backend: backend.to_string(),
            command,
            destination: destination.to_string(),
            job: None,
            paths: Vec::new(),
            exclude: Vec::new(),
            args: Vec::new(),
        }
    }
}

#[derive(Default)]
struct MockState {
    calls: Vec<MockCall>,
    failing: HashSet<String>,
    backups: HashMap<String, Vec<BackupRecord>>,
    exec_code: i32,
}

/// Provider handing out [`MockBackend`]s that share one call log
#[derive(Clone, Default)]
pub struct MockBackends {
    state: Arc<Mutex<MockState>>,
}

impl MockBackends {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `backend` fail as if it exited with status 1
    pub fn failing(self, backend: &str) -> Self {
        self.state.lock().failing.insert(backend.to_string());
        self
    }

    /// Records returned by `list-backups` for `destination`
    pub fn with_backups(self, destination: &str, backups: Vec<BackupRecord>) -> Self {
        self.state
            .lock()
            .backups
            .insert(destination.to_string(), backups);
        self
    }

    /// Exit code returned by `exec`
    pub fn with_exec_code(self, code: i32) -> Self {
        self.state.lock().exec_code = code;
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// Destinations contacted for `command`, in call order
    pub fn destinations_for(&self, command: Command) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.command == command)
            .map(|call| call.destination.clone())
            .collect()
    }
}

impl BackendProvider for MockBackends {
    fn client(&self, config: &Config, backend: &str) -> Result<Box<dyn Backend>, ProtoError> {
        if config.backend(backend).is_none() {
            return Err(ProtoError::UnknownBackend(backend.to_string()));
        }
        Ok(Box::new(MockBackend {
            name: backend.to_string(),
            state: self.state.clone(),
        }))
    }
}

pub struct MockBackend {
    name: String,
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    fn record(&self, call: MockCall) -> Result<(), ProtoError> {
        let command = call.command;
        let mut state = self.state.lock();
        state.calls.push(call);

        if state.failing.contains(&self.name) {
            return Err(ProtoError::Exited {
                backend: self.name.clone(),
                command,
                code: Some(1),
            });
        }
        Ok(())
    }
}

impl Backend for MockBackend {
    fn backup(&self, req: &BackupRequest) -> Result<(), ProtoError> {
        let mut call = MockCall::new(&self.name, Command::Backup, &req.destination_name);
        call.job = Some(req.job_name.clone());
        call.paths = req.paths.clone();
        call.exclude = req.exclude.clone();
        self.record(call)
    }

    fn exec(&self, req: &ExecRequest) -> Result<i32, ProtoError> {
        let mut call = MockCall::new(&self.name, Command::Exec, &req.destination_name);
        call.args = req.args.clone();
        self.record(call)?;
        Ok(self.state.lock().exec_code)
    }

    fn list_backups(&self, req: &ListBackupsRequest) -> Result<ListBackupsResponse, ProtoError> {
        self.record(MockCall::new(&self.name, Command::ListBackups, &req.destination_name))?;
        let backups = self
            .state
            .lock()
            .backups
            .get(&req.destination_name)
            .cloned()
            .unwrap_or_default();
        Ok(ListBackupsResponse { backups })
    }

    fn restore(&self, req: &RestoreRequest) -> Result<(), ProtoError> {
        let mut call = MockCall::new(&self.name, Command::Restore, &req.destination_name);
        call.args = vec![req.backup_id.clone(), req.output_dir.clone()];
        self.record(call)
    }
}
