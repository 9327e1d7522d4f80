use anyhow::{anyhow, bail, Result};
use clap::{ArgGroup, Parser, Subcommand};
use standard_backups::config::{self, Config, DEFAULT_LOCKFILE, DEFAULT_LOCK_TIMEOUT};
use standard_backups::managers::backup::BackupManager;
use standard_backups::managers::logging::{init_logging, LoggingConfig};
use standard_backups::proto::{Backend, BackendClient, ExecRequest, ListBackupsRequest, RestoreRequest};
use standard_backups::utils::command::emit;
use standard_backups::utils::format::{format_table, DEFAULT_COLUMNS};
use standard_backups::utils::{BackupLock, Redactor, Terminal};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "standard-backups")]
#[command(about = "Backup orchestration over pluggable backends", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Log as JSON lines
    #[arg(short = 'j', long, global = true)]
    log_json: bool,

    /// Disable coloured log output
    #[arg(long, global = true)]
    no_color: bool,

    /// Lock file guarding backup runs
    #[arg(short = 'L', long, global = true)]
    lockfile: Option<PathBuf>,

    /// How long to wait for another run to release the lock (e.g. 30s, 5m)
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    lock_timeout: Option<Duration>,

    /// Do not redact secrets from output
    #[arg(long, global = true)]
    show_secrets: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backup job
    Backup {
        /// Job name
        job: String,
    },

    /// Run backend-specific arguments against a backend or destination
    #[command(group(ArgGroup::new("target").required(true).args(["backend", "destination"])))]
    Exec {
        /// Backend to invoke
        #[arg(short, long)]
        backend: Option<String>,

        /// Destination whose backend and options are used
        #[arg(short, long)]
        destination: Option<String>,

        /// Arguments passed through to the backend
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// List backups stored in a destination
    ListBackups {
        /// Destination name
        destination: String,

        /// Print the records as JSON
        #[arg(long, conflicts_with = "columns")]
        json: bool,

        /// Columns to show; `extra.<path>` reads backend-specific fields
        #[arg(short = 'C', long, value_delimiter = ',')]
        columns: Vec<String>,
    },

    /// Restore a backup into a directory
    Restore {
        /// Destination name
        destination: String,

        /// Backup identifier as shown by list-backups
        backup_id: String,

        /// Directory to restore into
        output_dir: PathBuf,
    },

    /// List configured backends
    ListBackends,

    /// List configured recipes
    ListRecipes,

    /// List configured jobs
    ListJobs,

    /// Validate configuration file and backend binaries
    Validate,

    /// Print the resolved configuration
    PrintConfig,
}

fn main() {
    let cli = Cli::parse();
    let terminal = Terminal::new(Redactor::default());

    let code = match run(cli, &terminal) {
        Ok(code) => code,
        Err(e) => {
            let _ = emit(terminal.stderr(), &format!("Error: {}\n", render_error(&e)));
            1
        }
    };

    std::process::exit(code);
}

/// Top-level message followed by any cause it does not already mention
fn render_error(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    for cause in error.chain().skip(1) {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
    }
    message
}

fn run(cli: Cli, terminal: &Terminal) -> Result<i32> {
    let config = config::load_config(&cli.config)?;

    // Secrets must be registered before anything is written
    if !cli.show_secrets {
        terminal.redactor().add_secrets(config.secret_values())?;
    }

    let mut logging_config = LoggingConfig::from_config(&config.global, cli.log_level.as_deref())?;
    logging_config.json = cli.log_json;
    logging_config.color = !cli.no_color;
    let _log_guard = init_logging(&logging_config, terminal)?;

    debug!(config = ?cli.config, secrets = config.secret_values.len(), "Configuration loaded");

    match cli.command {
        Commands::Backup { job } => {
            let lockfile = cli
                .lockfile
                .or_else(|| config.global.lockfile.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCKFILE));
            let timeout = cli
                .lock_timeout
                .or(config.global.lock_timeout_seconds.map(Duration::from_secs))
                .unwrap_or(DEFAULT_LOCK_TIMEOUT);

            let mut lock = BackupLock::open(config::expand_tilde(&lockfile), timeout)?;
            let manager = BackupManager::new(config, terminal.clone());

            lock.run(|| manager.backup_job(&job))??;
            info!("Backup for job '{}' completed successfully", job);
            Ok(0)
        }

        Commands::Exec {
            backend,
            destination,
            args,
        } => {
            let (backend, request) = match destination {
                Some(name) => {
                    let destination = config
                        .destination(&name)
                        .ok_or_else(|| anyhow!("unknown destination {}", name))?;
                    let request = ExecRequest {
                        args,
                        destination_name: name.clone(),
                        options: destination.options.clone(),
                    };
                    (destination.backend.clone(), request)
                }
                None => {
                    let backend = backend.ok_or_else(|| anyhow!("either --backend or --destination is required"))?;
                    let request = ExecRequest {
                        args,
                        ..Default::default()
                    };
                    (backend, request)
                }
            };

            let client = BackendClient::new(&config, &backend, terminal.clone())?;
            Ok(client.exec(&request)?)
        }

        Commands::ListBackups {
            destination,
            json,
            columns,
        } => {
            let (client, options) = destination_client(&config, &destination, terminal)?;
            let response = client.list_backups(&ListBackupsRequest {
                destination_name: destination.clone(),
                options,
            })?;

            if json {
                let mut output = serde_json::to_string_pretty(&response.backups)?;
                output.push('\n');
                emit(terminal.stdout(), &output)?;
            } else if response.backups.is_empty() {
                info!("no backups found");
            } else {
                let columns = if columns.is_empty() {
                    DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect()
                } else {
                    columns
                };
                emit(terminal.stdout(), &format_table(&response.backups, &columns))?;
            }
            Ok(0)
        }

        Commands::Restore {
            destination,
            backup_id,
            output_dir,
        } => {
            let (client, options) = destination_client(&config, &destination, terminal)?;
            info!(destination = %destination, "Restoring backup {} into {:?}", backup_id, output_dir);

            client.restore(&RestoreRequest {
                backup_id,
                destination_name: destination,
                output_dir: output_dir.to_string_lossy().into_owned(),
                options,
            })?;
            info!("Restore completed successfully");
            Ok(0)
        }

        Commands::ListBackends => {
            let mut output = String::new();
            for (name, backend) in &config.backends {
                output.push_str(&format!(
                    "{}\t{}\tprotocol v{}\t{}\n",
                    name,
                    backend.bin.display(),
                    backend.protocol_version,
                    backend.description
                ));
            }
            emit(terminal.stdout(), &output)?;
            Ok(0)
        }

        Commands::ListRecipes => {
            let mut output = String::new();
            for (name, recipe) in &config.recipes {
                output.push_str(&format!("{}\t{}\t{}\n", name, recipe.paths.join(", "), recipe.description));
            }
            emit(terminal.stdout(), &output)?;
            Ok(0)
        }

        Commands::ListJobs => {
            let mut output = String::new();
            for (name, job) in &config.jobs {
                output.push_str(&format!("{}\t{}\t{}\n", name, job.recipe, job.backup_to.join(", ")));
            }
            emit(terminal.stdout(), &output)?;
            Ok(0)
        }

        Commands::Validate => {
            let issues = config::check_backend_binaries(&config);
            if !issues.is_empty() {
                let mut output = String::new();
                for issue in &issues {
                    output.push_str(&format!("  {}\n", issue));
                }
                emit(terminal.stderr(), &output)?;
                bail!("configuration has {} problem(s)", issues.len());
            }

            emit(terminal.stdout(), "Configuration is valid\n")?;
            Ok(0)
        }

        Commands::PrintConfig => {
            emit(terminal.stdout(), &toml::to_string_pretty(&config)?)?;
            Ok(0)
        }
    }
}

/// Client for a destination's backend, along with the destination's options
fn destination_client(
    config: &Config,
    destination: &str,
    terminal: &Terminal,
) -> Result<(BackendClient, config::Options)> {
    let dest = config
        .destination(destination)
        .ok_or_else(|| anyhow!("unknown destination {}", destination))?;
    let client = BackendClient::new(config, &dest.backend, terminal.clone())?;
    Ok((client, dest.options.clone()))
}
