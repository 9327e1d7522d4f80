//! Unit tests for the streaming redaction filter

use rstest::rstest;
use standard_backups::utils::Redactor;
use std::io::Write;

/// Feed `writes` through a redacting writer and return what came out
fn redact_writes(secrets: &[&str], writes: &[&str]) -> String {
    let redactor = Redactor::new(secrets.iter().copied()).unwrap();
    let mut writer = redactor.writer(Vec::new());
    for chunk in writes {
        writer.write_all(chunk.as_bytes()).unwrap();
    }
    String::from_utf8(writer.into_inner().unwrap()).unwrap()
}

#[rstest]
#[case::secret_split_across_writes(&["beepboop"], &["hello beep", "boop world"], "hello *** world")]
#[case::prefix_without_match(&["AAAAA"], &["hello AAA", "AB world"], "hello AAAAB world")]
#[case::no_secrets(&[], &["hello ", "world"], "hello world")]
#[case::secret_at_end_of_stream(&["tail"], &["ends with ta", "il"], "ends with ***")]
#[case::partial_prefix_at_end(&["secret"], &["ends with sec"], "ends with sec")]
#[case::repeated(&["ab"], &["abab", "xab"], "******x***")]
#[case::earliest_of_many(&["world", "lo w"], &["hello world"], "hel***orld")]
#[case::one_byte_per_write(&["xyz"], &["a", "x", "y", "z", "b"], "a***b")]
fn test_redaction(#[case] secrets: &[&str], #[case] writes: &[&str], #[case] expected: &str) {
    assert_eq!(redact_writes(secrets, writes), expected);
}

#[test]
fn test_every_split_point_is_redacted() {
    let input = "token=supersecretvalue; done";
    for split in 0..=input.len() {
        let (a, b) = input.split_at(split);
        let output = redact_writes(&["supersecretvalue"], &[a, b]);
        assert_eq!(output, "token=***; done", "split at {}", split);
    }
}

#[test]
fn test_no_partial_secret_is_emitted_before_finish() {
    let redactor = Redactor::new(["hunter2"]).unwrap();
    let mut writer = redactor.writer(Vec::new());

    writer.write_all(b"pw: hunt").unwrap();
    writer.flush().unwrap();
    assert_eq!(writer.pending(), b"hunt");

    writer.write_all(b"er2\n").unwrap();
    let output = writer.into_inner().unwrap();
    assert_eq!(output, b"pw: ***\n");
}

#[test]
fn test_empty_secret_is_rejected() {
    let err = Redactor::new(["ok", ""]).unwrap_err();
    assert_eq!(err.to_string(), "bad secret at index 1: secret is empty");

    let redactor = Redactor::default();
    assert!(redactor.add_secrets(["fine", ""]).is_err());
    assert!(redactor.is_empty());
}

#[test]
fn test_secrets_added_later_are_shared_by_clones() {
    let redactor = Redactor::default();
    let clone = redactor.clone();
    redactor.add_secrets(["late"]).unwrap();

    assert_eq!(clone.redact_str("too late"), "too ***");
    assert_eq!(clone.len(), 1);
}
