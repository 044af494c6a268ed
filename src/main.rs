use clap::Parser;
use std::process::ExitCode;

use leadboard::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Log filter variable, e.g. `LEADBOARD_LOG=leadboard=debug`.
const LOG_ENV: &str = "LEADBOARD_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
