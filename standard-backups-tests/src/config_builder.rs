//! Fluent API for building test configurations
//!
//! The builder produces TOML and loads it through the real loader, so names,
//! secrets and templates are resolved exactly as in production.

use serde_json::Value;
use standard_backups::config::{
    parse_config, BackendManifest, Config, Destination, GlobalConfig, Hook, HookSet, Job, Recipe,
    SecretConfig,
};
use standard_backups::proto::PROTOCOL_VERSION;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Which recipe hook to set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookSlot {
    Before,
    After,
    OnSuccess,
    OnFailure,
}

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    config: Config,
}

impl ConfigBuilder {
    /// Create an empty configuration with its own temp dir
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = Config::default();
        config.global = GlobalConfig {
            lockfile: Some(temp_dir.path().join("standard-backups.lock")),
            lock_timeout_seconds: Some(5),
            ..Default::default()
        };

        Self { temp_dir, config }
    }

    /// One backend `dump` at `bin`, recipe `app` over a data dir, destination
    /// `local` and job `nightly`
    pub fn minimal(bin: &Path) -> Self {
        let builder = Self::new();
        let data = builder.temp_dir.path().join("data");
        fs::create_dir_all(&data).expect("Failed to create data dir");

        builder
            .add_backend("dump", bin)
            .add_recipe("app", &[&data.display().to_string()])
            .add_destination("local", "dump", serde_json::json!({}))
            .add_job("nightly", "app", &["local"])
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn add_backend(mut self, name: &str, bin: &Path) -> Self {
        self.config.backends.insert(
            name.to_string(),
            BackendManifest {
                name: name.to_string(),
                bin: bin.to_path_buf(),
                protocol_version: PROTOCOL_VERSION,
                description: format!("Test backend: {}", name),
            },
        );
        self
    }

    pub fn with_protocol_version(mut self, backend: &str, version: u32) -> Self {
        if let Some(manifest) = self.config.backends.get_mut(backend) {
            manifest.protocol_version = version;
        }
        self
    }

    pub fn add_recipe(mut self, name: &str, paths: &[&str]) -> Self {
        self.config.recipes.insert(
            name.to_string(),
            Recipe {
                name: name.to_string(),
                description: format!("Test recipe: {}", name),
                paths: paths.iter().map(|p| p.to_string()).collect(),
                exclude: vec![],
                hooks: HookSet::default(),
            },
        );
        self
    }

    pub fn with_exclude(mut self, recipe: &str, exclude: &[&str]) -> Self {
        if let Some(recipe) = self.config.recipes.get_mut(recipe) {
            recipe.exclude = exclude.iter().map(|p| p.to_string()).collect();
        }
        self
    }

    pub fn with_hook(mut self, recipe: &str, slot: HookSlot, hook: Hook) -> Self {
        if let Some(recipe) = self.config.recipes.get_mut(recipe) {
            let target = match slot {
                HookSlot::Before => &mut recipe.hooks.before,
                HookSlot::After => &mut recipe.hooks.after,
                HookSlot::OnSuccess => &mut recipe.hooks.on_success,
                HookSlot::OnFailure => &mut recipe.hooks.on_failure,
            };
            *target = Some(hook);
        }
        self
    }

    /// Add a destination. `options` must be a JSON object.
    pub fn add_destination(mut self, name: &str, backend: &str, options: Value) -> Self {
        self.config.destinations.insert(
            name.to_string(),
            Destination {
                name: name.to_string(),
                backend: backend.to_string(),
                options: options.as_object().cloned().unwrap_or_default(),
            },
        );
        self
    }

    pub fn add_job(mut self, name: &str, recipe: &str, backup_to: &[&str]) -> Self {
        self.config.jobs.insert(
            name.to_string(),
            Job {
                name: name.to_string(),
                recipe: recipe.to_string(),
                backup_to: backup_to.iter().map(|d| d.to_string()).collect(),
            },
        );
        self
    }

    pub fn add_secret(mut self, name: &str, value: &str) -> Self {
        self.config.secrets.insert(
            name.to_string(),
            SecretConfig {
                literal: Some(value.to_string()),
                from_file: None,
            },
        );
        self
    }

    pub fn with_lock_timeout(mut self, seconds: u64) -> Self {
        self.config.global.lock_timeout_seconds = Some(seconds);
        self
    }

    pub fn with_log_level(mut self, level: &str) -> Self {
        self.config.global.log_level = Some(level.to_string());
        self
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(&self.config).expect("Failed to serialize config")
    }

    /// Load the configuration through the real loader
    pub fn build(&self) -> Config {
        parse_config(&self.to_toml()).expect("Failed to load built config")
    }

    /// Write `config.toml` into the temp dir and return its path with the dir
    pub fn persist(self) -> (PathBuf, TempDir) {
        let path = self.temp_dir.path().join("config.toml");
        fs::write(&path, self.to_toml()).expect("Failed to write config");
        (path, self.temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
