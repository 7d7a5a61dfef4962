mod cli;

use clap::Parser;

use cli::Cli;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    init_logging(args.verbose);

    if let Err(e) = cli::commands::run(&args).await {
        cli::output::error(&format!("Error: {e}"));
        std::process::exit(1);
    }
}

/// Log to stderr so stdout carries only command data.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
