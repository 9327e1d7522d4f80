//! Tests for the 'restore' command

use serial_test::serial;
use standard_backups::proto::{Backend, BackendClient, RestoreRequest};
use test_utils::{failing_backend, read_calls, recording_backend, ConfigBuilder, TestContext};

#[test]
#[serial]
fn test_restore_sends_id_and_output_dir() {
    let ctx = TestContext::new();
    let backend = recording_backend(ctx.temp_dir(), "dump");
    let output_dir = ctx.create_subdir("restore");
    let config = ConfigBuilder::minimal(&backend).build();

    let client = BackendClient::new(&config, "dump", ctx.terminal()).unwrap();
    client
        .restore(&RestoreRequest {
            backup_id: "snap0001".to_string(),
            destination_name: "local".to_string(),
            output_dir: output_dir.display().to_string(),
            options: Default::default(),
        })
        .unwrap();

    let calls = read_calls(ctx.temp_dir(), "dump");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0][0], "restore");
    assert_eq!(calls[0][1], "local");
    assert_eq!(calls[0][7], "snap0001");
    assert_eq!(calls[0][8], output_dir.display().to_string());
}

#[test]
#[serial]
fn test_restore_failure() {
    let ctx = TestContext::new();
    let backend = failing_backend(ctx.temp_dir(), "dump", 2);
    let config = ConfigBuilder::minimal(&backend).build();

    let client = BackendClient::new(&config, "dump", ctx.terminal()).unwrap();
    let err = client
        .restore(&RestoreRequest {
            backup_id: "missing".to_string(),
            destination_name: "local".to_string(),
            output_dir: "/tmp/nowhere".to_string(),
            options: Default::default(),
        })
        .unwrap_err();

    assert_eq!(err.to_string(), "backend dump exited with status 2 during restore");
}
