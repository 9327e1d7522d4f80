//! Tests for the 'exec' command
//!
//! Exec passes arguments through verbatim and forwards the exit code.

use serial_test::serial;
use standard_backups::proto::{Backend, BackendClient, ExecRequest, ProtoError};
use std::path::Path;
use test_utils::{read_calls, recording_backend, write_script, ConfigBuilder, TestContext};

#[test]
#[serial]
fn test_exec_against_destination_sends_options() {
    let ctx = TestContext::new();
    let backend = recording_backend(ctx.temp_dir(), "dump");
    let config = ConfigBuilder::minimal(&backend)
        .add_destination("local", "dump", serde_json::json!({"repo": "/srv/backups"}))
        .build();
    let destination = &config.destinations["local"];

    let client = BackendClient::new(&config, &destination.backend, ctx.terminal()).unwrap();
    let code = client
        .exec(&ExecRequest {
            args: vec!["snapshots".to_string(), "--tag".to_string(), "a b".to_string()],
            destination_name: destination.name.clone(),
            options: destination.options.clone(),
        })
        .unwrap();

    assert_eq!(code, 0);
    let calls = read_calls(ctx.temp_dir(), "dump");
    assert_eq!(calls[0][0], "exec");
    assert_eq!(calls[0][1], "local");
    assert_eq!(calls[0][5], r#"{"repo":"/srv/backups"}"#);
    assert_eq!(calls[0][6], r#"["snapshots","--tag","a b"]"#);
}

#[test]
#[serial]
fn test_exec_forwards_exit_code_and_output() {
    let ctx = TestContext::with_secrets(&["s3cret"]);
    let backend = write_script(
        ctx.temp_dir(),
        "dump",
        "echo \"args $STANDARD_BACKUPS_ARGS\"\necho 'key s3cret' >&2\nexit 42",
    );
    let config = ConfigBuilder::minimal(&backend).build();

    let client = BackendClient::new(&config, "dump", ctx.terminal()).unwrap();
    let code = client
        .exec(&ExecRequest {
            args: vec!["stats".to_string()],
            ..Default::default()
        })
        .unwrap();

    assert_eq!(code, 42);
    assert_eq!(ctx.stdout(), "args [\"stats\"]\n");
    assert_eq!(ctx.stderr(), "key ***\n");
}

#[test]
fn test_exec_unknown_backend() {
    let ctx = TestContext::new();
    let config = ConfigBuilder::minimal(Path::new("/bin/true")).build();

    let err = BackendClient::new(&config, "restic", ctx.terminal()).err().unwrap();
    assert!(matches!(err, ProtoError::UnknownBackend(ref name) if name == "restic"));
}
