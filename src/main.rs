use anyhow::Result;
use clap::Parser;
use tessera::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_directive = if cli.verbose { "tessera=debug" } else { "tessera=error" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    cli.run().await
}
