//! Vacation scheme search agent CLI
//!
//! Runs the search-and-email pipeline once, or on a weekly schedule.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use vacsearch::{
    error::Result,
    models::{BackupTarget, ConfigSource, RunOutcome, RunStage, Settings},
    pipeline::{self, DeliveryPipeline, WeeklySchedule},
    services::{SerpApiSearcher, SmtpMailer},
    storage::{GitRemote, HistoryStore, LocalHistoryStore, RemoteSync},
};

/// vacsearch - Vacation Scheme Search Agent
#[derive(Parser, Debug)]
#[command(
    name = "vacsearch",
    version,
    about = "Emails new vacation scheme search results"
)]
struct Cli {
    /// Path to the TOML configuration file (environment variables are used if absent)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search once and email new results (default)
    Run,

    /// Run every week at the configured day and time
    Schedule,

    /// Check configuration without contacting any service
    Validate,

    /// Show the sent-link history
    History {
        /// Print every recorded link
        #[arg(long)]
        list: bool,
    },
}

/// Default log filter: dependencies stay at `info` unless `--verbose`, while
/// this crate admits debug output for `logging.level` to switch on.
fn default_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("{level},vacsearch=debug")
}

/// Initialize logging based on verbosity flag.
///
/// The global max level is what `logging.level` later adjusts, unless
/// `RUST_LOG` or `--verbose` decide.
fn init_logging(verbose: bool) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter(verbose)),
    )
    .format_timestamp_secs()
    .init();
    if !verbose && std::env::var_os("RUST_LOG").is_none() {
        log::set_max_level(LevelFilter::Info);
    }
}

/// Apply `logging.level` from the configuration.
fn apply_log_level(settings: &Settings, verbose: bool) {
    if verbose || std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    match settings.logging.level.parse::<LevelFilter>() {
        Ok(level) => log::set_max_level(level),
        Err(_) => log::warn!(
            "Unknown logging.level {:?}, keeping info",
            settings.logging.level
        ),
    }
}

/// Build the history store with its configured backup target.
async fn build_store(settings: &Settings) -> LocalHistoryStore {
    let path = settings.history.path.clone();

    let remote: Option<Box<dyn RemoteSync>> = match &settings.backup {
        BackupTarget::None => None,
        BackupTarget::Git {
            repo_dir,
            remote,
            branch,
        } => Some(Box::new(GitRemote::new(
            repo_dir.clone(),
            &path,
            remote.clone(),
            branch.clone(),
        ))),
        #[cfg(feature = "s3")]
        BackupTarget::S3 { bucket, key } => Some(Box::new(
            vacsearch::storage::S3Backup::from_env(bucket.clone(), key.clone()).await,
        )),
        #[cfg(not(feature = "s3"))]
        BackupTarget::S3 { .. } => {
            log::warn!("backup.kind = \"s3\" needs the `s3` feature; remote backup disabled");
            None
        }
    };

    match remote {
        Some(remote) => LocalHistoryStore::with_remote(path, remote),
        None => LocalHistoryStore::new(path),
    }
}

/// Build the search and mail collaborators.
fn build_services(settings: &Settings) -> Result<(SerpApiSearcher, SmtpMailer)> {
    settings.validate()?;
    let provider = SerpApiSearcher::from_settings(&settings.serpapi)?;
    let transport = SmtpMailer::from_settings(&settings.email)?;
    Ok((provider, transport))
}

/// Execute one full run.
async fn run_once(settings: &Settings) -> RunOutcome {
    let (provider, transport) = match build_services(settings) {
        Ok(services) => services,
        Err(e) => {
            log::error!("Error in agent execution: {e}");
            return RunOutcome::failure(RunStage::Init, e);
        }
    };
    let store = build_store(settings).await;

    DeliveryPipeline::new(settings, &store, &provider, &transport)
        .run()
        .await
}

/// Main entry point for the CLI application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_logging(cli.verbose);

    let source = ConfigSource::select(&cli.config);
    let settings = match Settings::from_source(&source) {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    apply_log_level(&settings, cli.verbose);
    log::info!("Loaded configuration from {source}");

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let outcome = run_once(&settings).await;
            ExitCode::from(outcome.exit_code())
        }

        Command::Schedule => {
            let schedule = WeeklySchedule::from_settings(&settings.schedule);
            let settings = &settings;
            match pipeline::run_weekly(&schedule, move || run_once(settings)).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    log::error!("Scheduler failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = build_services(&settings) {
                log::error!("Config validation failed: {e}");
                return ExitCode::FAILURE;
            }
            log::info!("✓ Search, email, and history settings OK");
            log::info!("History file: {}", settings.history.path.display());
            log::info!(
                "Schedule: {}",
                WeeklySchedule::from_settings(&settings.schedule)
            );
            ExitCode::SUCCESS
        }

        Command::History { list } => {
            let store = build_store(&settings).await;
            let history = store.load().await;
            log::info!(
                "{} links recorded in {}",
                history.len(),
                store.path().display()
            );
            if list {
                for link in history.sorted() {
                    println!("{link}");
                }
            }
            ExitCode::SUCCESS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_keeps_dependencies_at_info() {
        assert_eq!(default_filter(false), "info,vacsearch=debug");
        assert_eq!(default_filter(true), "debug,vacsearch=debug");
    }

    #[test]
    fn test_defaults_to_run() {
        let cli = Cli::parse_from(["vacsearch"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from("config.toml"));
    }
}
