use anyhow::Result;
use tracing::error;

mod archive;
mod cli;
mod download;
mod extract;
mod fetch;
mod filter;
mod utils;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = cli::parse_args();

    // Initialize logging
    utils::logging::init_logging(args.verbose, args.log_file.clone())?;

    // Run the grab pipeline
    match cli::run(args).await {
        Ok(_) => Ok(()),
        Err(e) => {
            error!("Run failed: {:#}", e);
            Err(e)
        }
    }
}
