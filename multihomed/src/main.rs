//! multihomed: keeps per-interface policy routing tables in sync with
//! the kernel's main table.
//!
//! For every managed interface the daemon maintains a custom routing
//! table mirroring the main table's routes out of that interface, and
//! one source-address rule per address on it, so traffic sourced from a
//! managed address consults the custom table instead of the default.
//! Everything installed is removed again on shutdown.

mod cli;
mod config;
mod driver;
mod engine;
mod resolver;

use std::{fs::File, io, path::PathBuf, process::exit, sync::Arc};

use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    cli::Cli,
    config::{ConfigError, TableMap},
    driver::{Driver, DriverError},
};

#[derive(Debug, Error)]
enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("cannot open log file {path}: {source}")]
    LogFile { path: PathBuf, source: io::Error },
}

fn main() {
    let cli = Cli::parse_or_exit();
    if let Err(error) = run(cli) {
        eprintln!("multihomed error: {error}");
        exit(1);
    }
}

fn run(cli: Cli) -> Result<(), DaemonError> {
    init_logging(&cli)?;

    let mapping = TableMap::load(&cli.network, cli.config.as_deref())?;
    if mapping.is_empty() {
        warn!("no managed interfaces configured; nothing will be mirrored");
    }
    info!(
        version = env!("CARGO_PKG_VERSION"),
        interfaces = mapping.len(),
        "starting multihomed"
    );

    Driver::new(mapping)?.run()?;

    info!("clean shutdown");
    Ok(())
}

/// `RUST_LOG` wins when set; otherwise the CLI severity applies.
fn init_logging(cli: &Cli) -> Result<(), DaemonError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.default_directive()));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match &cli.logfile {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| DaemonError::LogFile { path: path.clone(), source })?;
            subscriber.with_ansi(false).with_writer(Arc::new(file)).init();
        }
        None => subscriber.with_ansi(cli.logcolor).init(),
    }
    Ok(())
}
