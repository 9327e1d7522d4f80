//! Unit tests for protocol request encoding and the backend-side dispatcher

use anyhow::Result;
use standard_backups::proto::server::{execute, BackendHandler};
use standard_backups::proto::{
    BackupRequest, ExecRequest, ListBackupsRequest, ListBackupsResponse, RestoreRequest, ENV_COMMAND,
};
use std::collections::HashMap;
use test_utils::{sample_record, sample_records};

/// A handler that keeps every request it gets
#[derive(Default)]
struct EchoHandler {
    backups: Vec<BackupRequest>,
    execs: Vec<ExecRequest>,
    restores: Vec<RestoreRequest>,
}

impl BackendHandler for EchoHandler {
    fn backup(&mut self, req: BackupRequest) -> Result<()> {
        self.backups.push(req);
        Ok(())
    }

    fn exec(&mut self, req: ExecRequest) -> Result<i32> {
        let code = req.args.len() as i32;
        self.execs.push(req);
        Ok(code)
    }

    fn list_backups(&mut self, _req: ListBackupsRequest) -> Result<ListBackupsResponse> {
        Ok(ListBackupsResponse {
            backups: sample_records(2),
        })
    }

    fn restore(&mut self, req: RestoreRequest) -> Result<()> {
        self.restores.push(req);
        Ok(())
    }
}

/// Environment a client would set for `command` and `vars`
fn environment(command: &str, vars: Vec<(&'static str, String)>) -> HashMap<String, String> {
    let mut env: HashMap<String, String> = vars.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    env.insert(ENV_COMMAND.to_string(), command.to_string());
    env
}

fn dispatch(handler: &mut EchoHandler, env: &HashMap<String, String>) -> (Result<i32>, Vec<u8>) {
    let mut stdout = Vec::new();
    let result = execute(handler, |name| env.get(name).cloned(), &mut stdout);
    (result, stdout)
}

#[test]
fn test_backup_request_reaches_handler() {
    let req = BackupRequest {
        paths: vec!["/var/lib/postgresql".to_string(), "/etc/postgresql".to_string()],
        exclude: vec!["*.tmp".to_string(), "*.log".to_string()],
        destination_name: "offsite".to_string(),
        job_name: "nightly".to_string(),
        options: serde_json::json!({"bucket": "b", "retries": 3, "verify": true})
            .as_object()
            .cloned()
            .unwrap(),
    };
    let env = environment("backup", req.to_env().unwrap());
    let mut handler = EchoHandler::default();

    let (result, stdout) = dispatch(&mut handler, &env);

    assert_eq!(result.unwrap(), 0);
    assert!(stdout.is_empty());
    assert_eq!(handler.backups, vec![req]);
}

#[test]
fn test_exec_returns_handler_code() {
    let req = ExecRequest {
        args: vec!["check".to_string(), "--read-data".to_string()],
        destination_name: "local".to_string(),
        options: Default::default(),
    };
    let env = environment("exec", req.to_env().unwrap());
    let mut handler = EchoHandler::default();

    let (result, _) = dispatch(&mut handler, &env);

    assert_eq!(result.unwrap(), 2);
    assert_eq!(handler.execs, vec![req]);
}

#[test]
fn test_list_backups_response_round_trips() {
    let req = ListBackupsRequest {
        destination_name: "local".to_string(),
        options: Default::default(),
    };
    let env = environment("list-backups", req.to_env().unwrap());

    let (result, stdout) = dispatch(&mut EchoHandler::default(), &env);

    assert_eq!(result.unwrap(), 0);
    let response: ListBackupsResponse = serde_json::from_slice(&stdout).unwrap();
    assert_eq!(response.backups, sample_records(2));
}

#[test]
fn test_restore_request_reaches_handler() {
    let req = RestoreRequest {
        backup_id: sample_record("abc").id,
        destination_name: "local".to_string(),
        output_dir: "/tmp/restore".to_string(),
        options: Default::default(),
    };
    let env = environment("restore", req.to_env().unwrap());
    let mut handler = EchoHandler::default();

    let (result, _) = dispatch(&mut handler, &env);

    assert_eq!(result.unwrap(), 0);
    assert_eq!(handler.restores, vec![req]);
}

#[test]
fn test_default_handler_rejects_commands() {
    struct Nothing;
    impl BackendHandler for Nothing {}

    let req = ListBackupsRequest {
        destination_name: "local".to_string(),
        options: Default::default(),
    };
    let env = environment("list-backups", req.to_env().unwrap());
    let mut stdout = Vec::new();

    let err = execute(&mut Nothing, |name| env.get(name).cloned(), &mut stdout).unwrap_err();

    assert_eq!(err.to_string(), "unhandled command list-backups");
    assert!(stdout.is_empty());
}
