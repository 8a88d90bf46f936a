//! cepcache - Resolve Brazilian postal codes to addresses
//!
//! Looks up each CEP given on the command line, answering from the local
//! SQLite cache when possible and from ViaCEP otherwise.

use std::io::{self, Write};

use clap::Parser;
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

use cepcache::cache::SqliteStore;
use cepcache::cli::{Cli, StartupConfig};
use cepcache::data::ViaCepClient;
use cepcache::resolver::{Outcome, Resolver};

/// Sets up stderr logging, controlled by `RUST_LOG` (warnings only by default)
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Writes a resolved address to `out`, or a diagnostic to stderr
fn print_outcome(out: &mut impl Write, outcome: &Outcome, json: bool) -> io::Result<()> {
    match &outcome.result {
        Ok(resolved) if json => {
            let line = serde_json::to_string(&resolved.record)?;
            writeln!(out, "{}", line)?;
        }
        Ok(resolved) => writeln!(out, "{}", resolved.record)?,
        Err(e) => eprintln!("{}", e),
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = StartupConfig::from_cli(&cli)?;

    // The store is the only fatal dependency; per-code failures are reported below
    let store = SqliteStore::open(&config.db_path).map_err(|e| {
        format!(
            "Failed to open database {}: {}",
            config.db_path.display(),
            e
        )
    })?;
    tracing::debug!(path = %config.db_path.display(), "opened cache database");

    let fetcher = match config.timeout {
        Some(timeout) => ViaCepClient::with_timeout(timeout)?,
        None => ViaCepClient::new(),
    }
    .with_base_url(config.base_url.as_str());

    let resolver = Resolver::new(&store, &fetcher);
    let outcomes = resolver.resolve_stream(config.codes.clone(), config.concurrency);
    futures::pin_mut!(outcomes);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    while let Some(outcome) = outcomes.next().await {
        match print_outcome(&mut out, &outcome, config.json) {
            Ok(()) => {}
            // Reader went away (e.g. piped into `head`); nothing left to do
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                tracing::debug!("stdout closed, stopping");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
