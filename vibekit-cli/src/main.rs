//! `vibekit`: developer CLI for the ONEsVIBE data-access helper.
//!
//! ```sh
//! export VIBEKIT_MONGO_URI=mongodb://localhost:27017/vibe
//! vibekit posts list posts --sort-by created_at
//! vibekit files upload ./cover.jpg --bucket media
//! vibekit users check dom
//! ```

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose);
    commands::run(cli).await
}

/// Logs go to stderr so command output can be piped.
fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn,vibekit=info,vibekit_core=info",
        1 => "info,vibekit=debug,vibekit_core=debug",
        _ => "debug,vibekit=trace,vibekit_core=trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
