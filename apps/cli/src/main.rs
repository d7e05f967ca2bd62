//! globdef CLI: goal-directed metadata enhancement for data files.
//!
//! Keeps an RDF sidecar next to every data file and lets enhancers fill it
//! in until no outstanding goal can be satisfied.

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
