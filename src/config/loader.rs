use super::types::*;
use crate::proto::PROTOCOL_VERSION;
use regex::{Captures, Regex};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Parser message and position only, never the quoted source line
    #[error("Failed to parse config file{}: {message}", format_location(*.location))]
    ParseError {
        location: Option<(usize, usize)>,
        message: String,
    },

    #[error("Failed to load secret {name}: {source}")]
    SecretRead {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Secret {0} must set exactly one of `literal` or `from_file`")]
    SecretSource(String),

    #[error("Secret {0} is empty")]
    EmptySecret(String),

    #[error("Unknown secret {secret} referenced at {field}")]
    UnknownSecret { field: String, secret: String },

    #[error("Unsupported shell {0:?}, expected one of sh, bash")]
    UnsupportedShell(String),

    #[error("Invalid configuration:\n{}", format_issues(.0))]
    Invalid(Vec<ValidationIssue>),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

fn format_location(location: Option<(usize, usize)>) -> String {
    match location {
        Some((line, column)) => format!(" at line {}, column {}", line, column),
        None => String::new(),
    }
}

impl ConfigError {
    fn parse(contents: &str, err: toml::de::Error) -> Self {
        let location = err.span().map(|span| {
            let before = contents.get(..span.start).unwrap_or(contents);
            let line = before.matches('\n').count() + 1;
            let column = before.len() - before.rfind('\n').map_or(0, |i| i + 1) + 1;
            (line, column)
        });

        ConfigError::ParseError {
            location,
            message: err.message().trim_end().to_string(),
        }
    }
}

/// One problem found while validating a configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Location of the offending value, e.g. `/jobs/nightly/backup_to/0`
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  {}", issue))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Load, resolve and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    debug!(config = ?path, "Loading config");

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&contents)
}

/// Parse, resolve and validate configuration from TOML text
pub fn parse_config(contents: &str) -> Result<Config> {
    let mut config: Config =
        toml::from_str(contents).map_err(|err| ConfigError::parse(contents, err))?;
    assign_names(&mut config);
    resolve_secrets(&mut config)?;
    apply_secret_templates(&mut config)?;

    let issues = validate_config(&config);
    if !issues.is_empty() {
        return Err(ConfigError::Invalid(issues));
    }

    Ok(config)
}

/// Copy each table key into the entry's `name`
fn assign_names(config: &mut Config) {
    for (name, backend) in config.backends.iter_mut() {
        backend.name = name.clone();
    }
    for (name, recipe) in config.recipes.iter_mut() {
        recipe.name = name.clone();
    }
    for (name, destination) in config.destinations.iter_mut() {
        destination.name = name.clone();
    }
    for (name, job) in config.jobs.iter_mut() {
        job.name = name.clone();
    }
}

/// Read every secret into `config.secret_values`
pub fn resolve_secrets(config: &mut Config) -> Result<()> {
    let mut values = std::collections::BTreeMap::new();

    for (name, secret) in &config.secrets {
        let value = load_secret(name, secret)?;
        if value.is_empty() {
            return Err(ConfigError::EmptySecret(name.clone()));
        }
        values.insert(name.clone(), value);
    }

    config.secret_values = values;
    Ok(())
}

fn load_secret(name: &str, secret: &SecretConfig) -> Result<String> {
    match (&secret.literal, &secret.from_file) {
        (Some(literal), None) => Ok(literal.clone()),
        (None, Some(file)) => {
            let path = super::expand_tilde(file);
            fs::read_to_string(&path).map_err(|source| ConfigError::SecretRead {
                name: name.to_string(),
                source,
            })
        }
        _ => Err(ConfigError::SecretSource(name.to_string())),
    }
}

fn secret_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*secrets\.([A-Za-z0-9_-]+)\s*\}\}").expect("secret pattern is valid")
    })
}

/// Substitute `{{ secrets.NAME }}` in every string of every destination's options
pub fn apply_secret_templates(config: &mut Config) -> Result<()> {
    let secrets = &config.secret_values;

    for (name, destination) in config.destinations.iter_mut() {
        for (key, value) in destination.options.iter_mut() {
            let field = format!("/destinations/{}/options/{}", name, key);
            template_value(&field, value, secrets)?;
        }
    }

    Ok(())
}

fn template_value(
    field: &str,
    value: &mut Value,
    secrets: &std::collections::BTreeMap<String, String>,
) -> Result<()> {
    match value {
        Value::String(s) => {
            let mut missing = None;
            let replaced = secret_pattern().replace_all(s, |caps: &Captures| {
                match secrets.get(&caps[1]) {
                    Some(secret) => secret.clone(),
                    None => {
                        missing.get_or_insert_with(|| caps[1].to_string());
                        String::new()
                    }
                }
            });

            if let Some(secret) = missing {
                return Err(ConfigError::UnknownSecret {
                    field: field.to_string(),
                    secret,
                });
            }

            let replaced = replaced.into_owned();
            *s = replaced;
        }
        Value::Array(items) => {
            for (index, item) in items.iter_mut().enumerate() {
                template_value(&format!("{}/{}", field, index), item, secrets)?;
            }
        }
        Value::Object(map) => {
            for (key, item) in map.iter_mut() {
                template_value(&format!("{}/{}", field, key), item, secrets)?;
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }

    Ok(())
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]*$").expect("name pattern is valid"))
}

fn check_name(issues: &mut Vec<ValidationIssue>, section: &str, name: &str) {
    if !name_pattern().is_match(name) {
        issues.push(ValidationIssue::new(
            format!("/{}/{}", section, name),
            "name must start with a letter and only contain letters, digits, '_' and '-'",
        ));
    }
}

/// Check cross references and shapes, collecting every problem
pub fn validate_config(config: &Config) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for (name, backend) in &config.backends {
        check_name(&mut issues, "backends", name);
        if backend.protocol_version != PROTOCOL_VERSION {
            issues.push(ValidationIssue::new(
                format!("/backends/{}/protocol_version", name),
                format!(
                    "unsupported protocol version {}, expected {}",
                    backend.protocol_version, PROTOCOL_VERSION
                ),
            ));
        }
    }

    for (name, recipe) in &config.recipes {
        check_name(&mut issues, "recipes", name);
        if recipe.paths.is_empty() {
            issues.push(ValidationIssue::new(
                format!("/recipes/{}/paths", name),
                "at least one path is required",
            ));
        }
    }

    for (name, destination) in &config.destinations {
        check_name(&mut issues, "destinations", name);
        if !config.backends.contains_key(&destination.backend) {
            issues.push(ValidationIssue::new(
                format!("/destinations/{}/backend", name),
                format!("unknown backend {}", destination.backend),
            ));
        }
    }

    for (name, job) in &config.jobs {
        check_name(&mut issues, "jobs", name);
        if !config.recipes.contains_key(&job.recipe) {
            issues.push(ValidationIssue::new(
                format!("/jobs/{}/recipe", name),
                format!("unknown recipe {}", job.recipe),
            ));
        }
        if job.backup_to.is_empty() {
            issues.push(ValidationIssue::new(
                format!("/jobs/{}/backup_to", name),
                "at least one destination is required",
            ));
        }
        for (index, destination) in job.backup_to.iter().enumerate() {
            if !config.destinations.contains_key(destination) {
                issues.push(ValidationIssue::new(
                    format!("/jobs/{}/backup_to/{}", name, index),
                    format!("unknown destination {}", destination),
                ));
            }
        }
    }

    issues
}

/// Check that every backend binary exists and is a file
pub fn check_backend_binaries(config: &Config) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for (name, backend) in &config.backends {
        let field = format!("/backends/{}/bin", name);
        let bin = super::expand_tilde(&backend.bin);

        let resolved = if bin.components().count() > 1 || bin.is_absolute() {
            Ok(bin.clone())
        } else {
            which::which(&bin)
        };

        match resolved {
            Ok(path) if path.is_dir() => {
                issues.push(ValidationIssue::new(field, format!("{} is a directory", path.display())));
            }
            Ok(path) if !path.exists() => {
                issues.push(ValidationIssue::new(field, format!("{} does not exist", path.display())));
            }
            Ok(_) => {}
            Err(e) => {
                issues.push(ValidationIssue::new(field, format!("{}: {}", bin.display(), e)));
            }
        }
    }

    issues
}
