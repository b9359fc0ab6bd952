//! Main entry point for the gist command-line tool

// Internal modules
mod handlers;
mod logging;

// Internal imports (std, crate)
use std::path::PathBuf;
use std::process::ExitCode;

// External imports (alphabetized)
use clap::{Parser, Subcommand};
use gist_common::initialize_environment;
use gist_config::source::ConfigurationLoader;

/// Semantic code search over functions, methods and classes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional configuration file path (TOML format)
    #[arg(long = "config", short = 'c', global = true)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index every supported source file under ROOT (rebuilds by default)
    Index {
        #[arg(default_value = ".")]
        root: PathBuf,
    },
    /// Find the blocks closest to a natural-language query
    Search {
        query: String,

        #[arg(default_value = ".")]
        root: PathBuf,

        /// Number of results (defaults to search.default_limit)
        #[arg(short = 'k', long = "limit")]
        limit: Option<usize>,

        /// Print hits as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what is stored for ROOT
    Status {
        #[arg(default_value = ".")]
        root: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    initialize_environment();
    let args = Args::parse();

    let config = match ConfigurationLoader::standard(args.config_file.as_deref()).load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Keep the guards alive until exit so buffered log lines are flushed
    let _log_guards = match logging::init(&config.telemetry) {
        Ok(guards) => guards,
        Err(e) => {
            eprintln!("Logging setup failed: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!("Configuration loaded: {config:?}");

    let mut out = std::io::stdout().lock();
    let mut err = std::io::stderr().lock();

    let result = match args.command {
        Command::Index { root } => handlers::index::run(&config, &root, &mut out, &mut err).await,
        Command::Search {
            query,
            root,
            limit,
            json,
        } => {
            handlers::search::run(&config, &query, &root, limit, json, &mut out, &mut err).await
        }
        Command::Status { root } => {
            handlers::status::run(&config, &root, &mut out, &mut err).await
        }
    };

    result.unwrap_or_else(|e| {
        tracing::error!("{e:#}");
        eprintln!("Error: {e:#}");
        ExitCode::FAILURE
    })
}
