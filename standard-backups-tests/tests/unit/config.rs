//! Unit tests for configuration loading and validation

use standard_backups::config::{load_config, ConfigError, Shell};
use std::path::Path;
use test_utils::{ConfigBuilder, TestContext};

#[test]
fn test_config_loading_valid() {
    let (config_path, _temp_dir) = ConfigBuilder::minimal(Path::new("/bin/true")).persist();

    let loaded = load_config(&config_path);
    assert!(loaded.is_ok(), "Config should load successfully: {:?}", loaded.err());

    let config = loaded.unwrap();
    assert!(config.jobs.contains_key("nightly"));
    assert_eq!(config.backends["dump"].name, "dump");
}

#[test]
fn test_config_loading_missing_file() {
    let err = load_config("/nonexistent/standard-backups.toml").unwrap_err();
    assert!(matches!(err, ConfigError::ReadError { .. }));
    assert!(err.to_string().contains("/nonexistent/standard-backups.toml"));
}

#[test]
fn test_config_with_syntax_error() {
    let ctx = TestContext::new();
    let path = ctx.create_file("config.toml", "[jobs.nightly\nrecipe = ");
    assert!(matches!(load_config(&path), Err(ConfigError::ParseError { .. })));
}

#[test]
fn test_secret_from_file_is_templated() {
    let ctx = TestContext::new();
    let secret_file = ctx.create_file("repo-password", "correct horse");

    let config_path = ctx.create_file(
        "config.toml",
        &format!(
            r#"
[secrets.repo]
from_file = {:?}

[backends.dump]
bin = "/bin/true"
protocol_version = 1

[recipes.app]
paths = ["/srv/app"]

[destinations.local]
backend = "dump"
options = {{ repo = "/srv/backups", env = {{ RESTIC_PASSWORD = "{{{{ secrets.repo }}}}" }} }}

[jobs.nightly]
recipe = "app"
backup_to = ["local"]
"#,
            secret_file.display().to_string()
        ),
    );

    let config = load_config(&config_path).unwrap();
    assert_eq!(
        config.destinations["local"].options["env"]["RESTIC_PASSWORD"],
        "correct horse"
    );
    assert_eq!(config.secret_values().collect::<Vec<_>>(), vec!["correct horse"]);
}

#[test]
fn test_missing_secret_file() {
    let ctx = TestContext::new();
    let config_path = ctx.create_file(
        "config.toml",
        r#"
[secrets.repo]
from_file = "/nonexistent/secret"
"#,
    );

    let err = load_config(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::SecretRead { ref name, .. } if name == "repo"));
}

#[test]
fn test_hook_shells() {
    let ctx = TestContext::new();
    let config_path = ctx.create_file(
        "config.toml",
        r#"
[recipes.app]
paths = ["/srv/app"]
before = { shell = "bash", command = "echo before" }
after = { shell = "sh", command = "echo after" }
"#,
    );

    let config = load_config(&config_path).unwrap();
    let hooks = &config.recipes["app"].hooks;
    assert_eq!(hooks.before.as_ref().unwrap().shell, Shell::Bash);
    assert_eq!(hooks.after.as_ref().unwrap().shell, Shell::Sh);
    assert!(hooks.on_success.is_none());

    let config_path = ctx.create_file(
        "bad-shell.toml",
        r#"
[recipes.app]
paths = ["/srv/app"]
before = { shell = "fish", command = "echo before" }
"#,
    );
    assert!(matches!(load_config(&config_path), Err(ConfigError::ParseError { .. })));
}

#[test]
fn test_validation_reports_every_problem() {
    let ctx = TestContext::new();
    let config_path = ctx.create_file(
        "config.toml",
        r#"
[backends.dump]
bin = "/bin/true"
protocol_version = 3

[recipes.app]
paths = []

[destinations.local]
backend = "missing"

[jobs.nightly]
recipe = "app"
backup_to = []
"#,
    );

    let err = load_config(&config_path).unwrap_err();
    let ConfigError::Invalid(issues) = &err else {
        panic!("expected validation failure, got {}", err);
    };

    let fields: Vec<_> = issues.iter().map(|i| i.field.as_str()).collect();
    assert_eq!(
        fields,
        vec![
            "/backends/dump/protocol_version",
            "/recipes/app/paths",
            "/destinations/local/backend",
            "/jobs/nightly/backup_to",
        ]
    );
    assert!(err.to_string().starts_with("Invalid configuration:\n"));
}

#[test]
fn test_logging_settings_from_global() {
    use standard_backups::managers::logging::LoggingConfig;
    use tracing::Level;

    let config = ConfigBuilder::minimal(Path::new("/bin/true"))
        .with_log_level("warn")
        .build();

    let logging = LoggingConfig::from_config(&config.global, None).unwrap();
    assert_eq!(logging.level, Level::WARN);
    assert!(logging.log_directory.is_none());

    let logging = LoggingConfig::from_config(&config.global, Some("trace")).unwrap();
    assert_eq!(logging.level, Level::TRACE);
}
