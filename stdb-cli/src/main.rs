//! Command-line reader for STDB music catalogs

mod config;
mod print;

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::{Config, OutputFormat};
use stdb_core::{validate_database, Database, OpenOptions};

#[derive(Parser)]
#[command(name = "stdb")]
#[command(about = "Decode an STDB music catalog and list its albums and tracks")]
#[command(version)]
struct Cli {
    /// Path to the database file
    db_path: PathBuf,

    /// Dump the decoded catalog as JSON
    #[arg(long)]
    json: bool,

    /// Fail on records whose magic value does not match
    #[arg(long)]
    strict: bool,

    /// Run consistency checks after decoding
    #[arg(long)]
    check: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl From<&Cli> for Config {
    fn from(cli: &Cli) -> Self {
        Self {
            db_path: cli.db_path.clone(),
            output: if cli.json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            open: OpenOptions {
                verify_magic: cli.strict,
            },
            check: cli.check,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    match run(Config::from(&cli)) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Returns `Ok(false)` when the consistency report found errors
fn run(config: Config) -> anyhow::Result<bool> {
    debug!("Opening {:?} with {:?}", config.db_path, config.open);
    let db = Database::open_with(&config.db_path, config.open)?;

    let report = config.check.then(|| validate_database(&db));
    if let Some(report) = &report {
        for warning in &report.warnings {
            warn!("{}", warning);
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match config.output {
        OutputFormat::Text => {
            print::print_catalog(&db, &mut out)?;
            if let Some(report) = &report {
                writeln!(out, "\n{}", report)?;
            }
        }
        OutputFormat::Json => print::write_json(&db, report.as_ref(), &mut out)?,
    }

    Ok(report.map_or(true, |r| r.valid))
}
