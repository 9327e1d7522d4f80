//! Backup manager - orchestrates one job run
//!
//! Phases run strictly in order: before hook, fan-out to every destination,
//! after hook, then on-success or on-failure. A failing before hook skips
//! the fan-out and the after hook. Every failure is recorded and returned
//! together instead of stopping the run.

use crate::config::{Config, Hook, Recipe};
use crate::managers::hooks::{HookError, HookKind, HookRunner};
use crate::proto::{BackendProvider, BackupRequest, ProcessBackends, ProtoError};
use crate::utils::output::Terminal;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn};

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("unknown job {0}")]
    UnknownJob(String),

    #[error("job {job} references unknown recipe {recipe}")]
    UnknownRecipe { job: String, recipe: String },

    #[error("{}", format_failures(.0))]
    Failed(Vec<RunFailure>),
}

impl BackupError {
    /// Every recorded failure, in the order it happened
    pub fn failures(&self) -> &[RunFailure] {
        match self {
            BackupError::Failed(failures) => failures,
            _ => &[],
        }
    }
}

fn format_failures(failures: &[RunFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// One cause contributing to a failed run
#[derive(Debug, thiserror::Error)]
pub enum RunFailure {
    #[error("before hook failed: {0}")]
    BeforeHook(#[source] HookError),

    #[error("{}", format_destinations(*.failed, *.total, .errors))]
    Destinations {
        failed: usize,
        total: usize,
        errors: Vec<DestinationError>,
    },

    #[error("after hook failed: {0}")]
    AfterHook(#[source] HookError),

    #[error("on-success hook failed: {0}")]
    OnSuccessHook(#[source] HookError),

    #[error("on-failure hook failed: {0}")]
    OnFailureHook(#[source] HookError),
}

fn format_destinations(failed: usize, total: usize, errors: &[DestinationError]) -> String {
    let mut message = format!("{}/{} backup operation(s) failed", failed, total);
    for error in errors {
        message.push_str("\n  ");
        message.push_str(&error.to_string());
    }
    message
}

/// Why a single destination was not backed up
#[derive(Debug, thiserror::Error)]
pub enum DestinationError {
    #[error("unknown destination {0}")]
    UnknownDestination(String),

    #[error("destination {destination}: {source}")]
    Backend {
        destination: String,
        #[source]
        source: ProtoError,
    },
}

impl DestinationError {
    pub fn destination(&self) -> &str {
        match self {
            DestinationError::UnknownDestination(name) => name,
            DestinationError::Backend { destination, .. } => destination,
        }
    }
}

pub struct BackupManager {
    config: Config,
    hooks: HookRunner,
    backends: Arc<dyn BackendProvider>,
}

impl BackupManager {
    /// Create a manager that runs real backend executables
    pub fn new(config: Config, terminal: Terminal) -> Self {
        Self {
            config,
            hooks: HookRunner::new(terminal.clone()),
            backends: Arc::new(ProcessBackends::new(terminal)),
        }
    }

    /// Replace how backend clients are created
    pub fn with_backends<B: BackendProvider + 'static>(mut self, backends: B) -> Self {
        self.backends = Arc::new(backends);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run backup for a job
    pub fn backup_job(&self, job_name: &str) -> Result<(), BackupError> {
        let job = self
            .config
            .job(job_name)
            .ok_or_else(|| BackupError::UnknownJob(job_name.to_string()))?;
        let recipe = self
            .config
            .recipe(&job.recipe)
            .ok_or_else(|| BackupError::UnknownRecipe {
                job: job_name.to_string(),
                recipe: job.recipe.clone(),
            })?;

        let _span = info_span!("backup", job = %job_name, recipe = %recipe.name).entered();
        let start_time = Instant::now();
        info!("Starting backup for job: {}", job_name);

        let mut failures = Vec::new();

        match self.run_hook(HookKind::Before, recipe.hooks.before.as_ref()) {
            Err(e) => {
                error!("Before hook failed, skipping backup: {}", e);
                failures.push(RunFailure::BeforeHook(e));
            }
            Ok(()) => {
                if let Some(failure) = self.backup_to_destinations(job_name, &job.backup_to, recipe) {
                    failures.push(failure);
                }
                if let Err(e) = self.run_hook(HookKind::After, recipe.hooks.after.as_ref()) {
                    error!("After hook failed: {}", e);
                    failures.push(RunFailure::AfterHook(e));
                }
            }
        }

        if failures.is_empty() {
            if let Err(e) = self.run_hook(HookKind::OnSuccess, recipe.hooks.on_success.as_ref()) {
                error!("On-success hook failed: {}", e);
                failures.push(RunFailure::OnSuccessHook(e));
            }
        }

        // Re-checked so a failing on-success hook still triggers on-failure
        if !failures.is_empty() {
            if let Err(e) = self.run_hook(HookKind::OnFailure, recipe.hooks.on_failure.as_ref()) {
                error!("On-failure hook failed: {}", e);
                failures.push(RunFailure::OnFailureHook(e));
            }
        }

        let duration = start_time.elapsed();
        if failures.is_empty() {
            info!(
                "Backup for job '{}' completed in {}",
                job_name,
                humantime::format_duration(round_secs(duration))
            );
            Ok(())
        } else {
            warn!(
                "Backup for job '{}' finished with {} failure(s) after {}",
                job_name,
                failures.len(),
                humantime::format_duration(round_secs(duration))
            );
            Err(BackupError::Failed(failures))
        }
    }

    fn run_hook(&self, kind: HookKind, hook: Option<&Hook>) -> Result<(), HookError> {
        match hook {
            Some(hook) => self.hooks.run(kind, hook),
            None => Ok(()),
        }
    }

    /// Back up to each destination in order, continuing past failures
    fn backup_to_destinations(
        &self,
        job_name: &str,
        destinations: &[String],
        recipe: &Recipe,
    ) -> Option<RunFailure> {
        let mut errors = Vec::new();

        for name in destinations {
            let _span = info_span!("destination", destination = %name).entered();

            match self.backup_to_destination(job_name, name, recipe) {
                Ok(()) => info!("Backup to destination '{}' succeeded", name),
                Err(e) => {
                    error!("Backup to destination '{}' failed: {}", name, e);
                    errors.push(e);
                }
            }
        }

        if errors.is_empty() {
            return None;
        }

        Some(RunFailure::Destinations {
            failed: errors.len(),
            total: destinations.len(),
            errors,
        })
    }

    fn backup_to_destination(
        &self,
        job_name: &str,
        name: &str,
        recipe: &Recipe,
    ) -> Result<(), DestinationError> {
        let destination = self
            .config
            .destination(name)
            .ok_or_else(|| DestinationError::UnknownDestination(name.to_string()))?;

        let backend_error = |source| DestinationError::Backend {
            destination: name.to_string(),
            source,
        };

        info!(backend = %destination.backend, "Backing up to destination: {}", name);

        let client = self
            .backends
            .client(&self.config, &destination.backend)
            .map_err(backend_error)?;

        client
            .backup(&BackupRequest {
                paths: recipe.paths.clone(),
                exclude: recipe.exclude.clone(),
                destination_name: name.to_string(),
                job_name: job_name.to_string(),
                options: destination.options.clone(),
            })
            .map_err(backend_error)
    }
}

fn round_secs(duration: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_secs(duration.as_secs())
}

impl fmt::Debug for BackupManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupManager")
            .field("jobs", &self.config.jobs.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
