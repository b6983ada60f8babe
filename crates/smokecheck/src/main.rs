use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let parsed = cli::Cli::parse();

    match parsed.dispatch().await {
        Ok(()) => Ok(()),
        Err(err) => {
            // Failed checks were already reported by the harness
            if let Some(failed) = err.downcast_ref::<commands::ChecksFailed>() {
                std::process::exit(failed.0);
            }
            Err(err)
        }
    }
}
