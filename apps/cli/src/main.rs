//! InternScout CLI — resumable internship posting crawler.
//!
//! Fetches the posting feed, scrapes each new posting's description with a
//! pool of headless browsers, tags it with keywords, and stores the result.

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
