//! reportgen CLI: turn a topic into a structured report.
//!
//! Plans an outline, writes and polishes each section with a text generation
//! service, picks charts, and exports the result to Markdown, JSON, or RTF.

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
