pub mod commands;
pub mod config;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Target page URL (the configured fallback URL is used when omitted)
    pub url: Option<String>,

    /// Base directory for downloaded images
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Delay between downloads in seconds
    #[arg(short, long)]
    pub delay: Option<f64>,

    /// Log every extraction layer and classification decision
    #[arg(short, long)]
    pub verbose: bool,

    /// Zip the save directory once downloads finish
    #[arg(short, long)]
    pub zip: bool,

    /// Load settings from an explicit YAML file instead of the config dir
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Parse command line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Run the grab pipeline
pub async fn run(cli: Cli) -> Result<()> {
    commands::grab(cli).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert()
    }
}
