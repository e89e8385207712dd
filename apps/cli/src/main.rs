//! mediaqueue CLI: queue media submissions and drain them into category pages.
//!
//! Intended to be driven by a scheduler: `submit` on each incoming request,
//! `drain` on a timer.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
