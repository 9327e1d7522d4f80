//! Tests for the 'list-backups' command

use serial_test::serial;
use standard_backups::proto::{Backend, BackendClient, ListBackupsRequest, ProtoError};
use test_utils::{
    failing_backend, listing_backend, sample_records, write_script, ConfigBuilder,
    ListBackupsResponse, TestContext,
};

fn request() -> ListBackupsRequest {
    ListBackupsRequest {
        destination_name: "local".to_string(),
        options: Default::default(),
    }
}

#[test]
#[serial]
fn test_list_backups_decodes_every_field() {
    let ctx = TestContext::new();
    let response = ListBackupsResponse {
        backups: sample_records(3),
    };
    let backend = listing_backend(ctx.temp_dir(), "dump", &response);
    let config = ConfigBuilder::minimal(&backend).build();

    let client = BackendClient::new(&config, "dump", ctx.terminal()).unwrap();
    let listed = client.list_backups(&request()).unwrap();

    assert_eq!(listed, response);
    assert_eq!(listed.backups[2].extra["stats"]["files"], 12);
    // Captured for decoding, not echoed
    assert!(ctx.stdout().is_empty());
}

#[test]
#[serial]
fn test_list_backups_empty() {
    let ctx = TestContext::new();
    let backend = listing_backend(ctx.temp_dir(), "dump", &ListBackupsResponse::default());
    let config = ConfigBuilder::minimal(&backend).build();

    let client = BackendClient::new(&config, "dump", ctx.terminal()).unwrap();
    assert!(client.list_backups(&request()).unwrap().backups.is_empty());
}

#[test]
#[serial]
fn test_null_extra_from_backend() {
    let ctx = TestContext::new();
    let backend = write_script(
        ctx.temp_dir(),
        "dump",
        r#"echo '{"backups":[{"id":"a","time":"t","job":"j","destination":"local","bytes":1,"extra":null}]}'"#,
    );
    let config = ConfigBuilder::minimal(&backend).build();

    let client = BackendClient::new(&config, "dump", ctx.terminal()).unwrap();
    let listed = client.list_backups(&request()).unwrap();

    assert_eq!(listed.backups.len(), 1);
    assert!(listed.backups[0].extra.is_empty());
}

#[test]
#[serial]
fn test_malformed_response_is_a_decode_error() {
    let ctx = TestContext::new();
    let backend = write_script(ctx.temp_dir(), "dump", "echo '{\"backups\": [{\"id\": 1}]}'");
    let config = ConfigBuilder::minimal(&backend).build();

    let client = BackendClient::new(&config, "dump", ctx.terminal()).unwrap();
    let err = client.list_backups(&request()).unwrap_err();

    assert!(matches!(err, ProtoError::Decode { .. }), "{}", err);
}

#[test]
#[serial]
fn test_nonzero_exit_is_not_a_decode_error() {
    let ctx = TestContext::new();
    let backend = failing_backend(ctx.temp_dir(), "dump", 5);
    let config = ConfigBuilder::minimal(&backend).build();

    let client = BackendClient::new(&config, "dump", ctx.terminal()).unwrap();
    let err = client.list_backups(&request()).unwrap_err();

    assert!(matches!(err, ProtoError::Exited { code: Some(5), .. }), "{}", err);
    assert!(ctx.stderr().contains("dump failed on purpose"));
}
