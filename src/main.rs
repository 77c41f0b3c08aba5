use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use driverdock::cli::Cli;
use driverdock::error::Result;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Cli::parse().run()
}
