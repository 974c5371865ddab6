use adabank::application::engine::BankEngine;
use adabank::config::{self, BankConfig};
use adabank::interfaces::csv::request_reader::RequestReader;
use adabank::interfaces::session::BankClient;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Client request files, one `<accountId|N> <deposit|withdraw> <amount>` per line
    requests: Vec<PathBuf>,

    /// Ledger snapshot, loaded at startup and rewritten at shutdown
    #[arg(long, default_value = config::DEFAULT_SNAPSHOT_PATH)]
    db: PathBuf,

    /// Audit log of applied mutations
    #[arg(long, default_value = config::DEFAULT_AUDIT_PATH)]
    log: PathBuf,

    /// Maximum number of accounts
    #[arg(long, default_value_t = config::DEFAULT_CAPACITY)]
    capacity: usize,

    /// Shut down once the request files are processed instead of waiting for Ctrl-C
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = BankConfig::with_paths(cli.db, cli.log).with_capacity(cli.capacity);
    let engine = BankEngine::from_config(&config).await.into_diagnostic()?;
    let client = engine.client();

    // Ctrl-C must reach `shutdown` even while request files are still in flight.
    let interrupted = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.into_diagnostic()?;
            info!("interrupted while processing request files");
            true
        }
        () = submit_request_files(&client, &cli.requests) => false,
    };

    if !interrupted && !cli.once {
        tokio::signal::ctrl_c().await.into_diagnostic()?;
    }

    engine.shutdown().await.into_diagnostic()?;
    Ok(())
}

async fn submit_request_files(client: &BankClient, paths: &[PathBuf]) {
    for path in paths {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot open request file");
                continue;
            }
        };
        let requests = RequestReader::new(file).valid_requests();
        info!(path = %path.display(), requests = requests.len(), "submitting client requests");

        for (i, response) in client.submit_batch(requests).await.into_iter().enumerate() {
            match response {
                Ok(response) => println!("Response from server for request {}: {}", i + 1, response),
                Err(e) => eprintln!("Error processing request {}: {}", i + 1, e),
            }
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
