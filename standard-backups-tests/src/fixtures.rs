//! Test fixtures: script backends and sample data
//!
//! Backends are small `#!/bin/sh` scripts written into a temp dir. They
//! speak the real protocol, so they exercise the subprocess client end to end.

use standard_backups::config::Options;
use standard_backups::proto::{BackupRecord, ListBackupsResponse};
use std::fs;
use std::path::{Path, PathBuf};

/// Write an executable shell script named `name` into `dir`
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write script");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to make script executable");
    }

    path
}

/// File where [`recording_backend`] appends one line per call
pub fn calls_file(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.calls", name))
}

/// Backend that appends every protocol variable it received to
/// `<name>.calls`, separated by `|`, then exits 0
pub fn recording_backend(dir: &Path, name: &str) -> PathBuf {
    let calls = calls_file(dir, name);
    write_script(
        dir,
        name,
        &format!(
            r#"echo "$STANDARD_BACKUPS_COMMAND|$STANDARD_BACKUPS_DESTINATION_NAME|$STANDARD_BACKUPS_JOB_NAME|$STANDARD_BACKUPS_PATHS|$STANDARD_BACKUPS_EXCLUDE|$STANDARD_BACKUPS_OPTIONS|$STANDARD_BACKUPS_ARGS|$STANDARD_BACKUPS_BACKUP_ID|$STANDARD_BACKUPS_OUTPUT_DIR" >> '{}'"#,
            calls.display()
        ),
    )
}

/// Recorded calls of a [`recording_backend`], split into fields
pub fn read_calls(dir: &Path, name: &str) -> Vec<Vec<String>> {
    fs::read_to_string(calls_file(dir, name))
        .unwrap_or_default()
        .lines()
        .map(|line| line.split('|').map(str::to_string).collect())
        .collect()
}

/// Backend that prints a message to stderr and exits with `code`
pub fn failing_backend(dir: &Path, name: &str, code: i32) -> PathBuf {
    write_script(
        dir,
        name,
        &format!("echo '{} failed on purpose' >&2\nexit {}", name, code),
    )
}

/// Backend that answers `list-backups` with `response` and echoes anything else
pub fn listing_backend(dir: &Path, name: &str, response: &ListBackupsResponse) -> PathBuf {
    let json_file = dir.join(format!("{}.json", name));
    fs::write(
        &json_file,
        serde_json::to_string(response).expect("Failed to encode response"),
    )
    .expect("Failed to write response");

    write_script(
        dir,
        name,
        &format!(
            r#"if [ "$STANDARD_BACKUPS_COMMAND" = "list-backups" ]; then
  cat '{}'
else
  echo "unexpected command $STANDARD_BACKUPS_COMMAND" >&2
  exit 2
fi"#,
            json_file.display()
        ),
    )
}

/// Backend that writes `started` and then blocks until `release` exists
pub fn blocking_backend(dir: &Path, name: &str, started: &Path, release: &Path) -> PathBuf {
    write_script(
        dir,
        name,
        &format!(
            "touch '{}'\nwhile [ ! -e '{}' ]; do sleep 0.05; done",
            started.display(),
            release.display()
        ),
    )
}

/// Backend that prints `secret` to stdout, split across two writes
pub fn leaky_backend(dir: &Path, name: &str, secret: &str) -> PathBuf {
    let (head, tail) = secret.split_at(secret.len() / 2);
    write_script(
        dir,
        name,
        &format!(
            "printf 'password is {}'\nsleep 0.1\nprintf '{} ok\\n'\necho \"stderr $STANDARD_BACKUPS_OPTIONS\" >&2",
            head, tail
        ),
    )
}

/// Hook command appending `line` to `log`
pub fn log_hook_command(log: &Path, line: &str) -> String {
    format!("echo {} >> '{}'", line, log.display())
}

/// Hook command appending `line` to `log`, then failing
pub fn failing_hook_command(log: &Path, line: &str) -> String {
    format!("echo {} >> '{}'; exit 1", line, log.display())
}

/// Lines of a hook log, empty if no hook ran
pub fn read_log(log: &Path) -> Vec<String> {
    fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Create a sample backup record for testing
pub fn sample_record(id: &str) -> BackupRecord {
    let mut extra = Options::new();
    extra.insert("host".to_string(), serde_json::json!("db1"));
    extra.insert("stats".to_string(), serde_json::json!({"files": 12}));

    BackupRecord {
        id: id.to_string(),
        time: "2025-12-28T10:30:00Z".to_string(),
        job: "nightly".to_string(),
        destination: "local".to_string(),
        bytes: 1536,
        extra,
    }
}

/// Create multiple sample records for testing
pub fn sample_records(count: usize) -> Vec<BackupRecord> {
    (0..count)
        .map(|i| BackupRecord {
            bytes: 1024u64.pow((i % 4) as u32),
            time: format!("2025-12-{:02}T10:30:00Z", 28 - (i % 28)),
            ..sample_record(&format!("snap{:04}", i))
        })
        .collect()
}
