//! Vampi CLI binary entry point.

use clap::Parser;
use vampi::cli::{App, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "vampi=debug" } else { "warn" };
    let base_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(base_filter))
        .with_writer(std::io::stderr)
        .init();

    let result = match App::from_cli(&cli) {
        Ok(mut app) => app.run(&cli.command).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
