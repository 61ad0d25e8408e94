use anyhow::Result;
use clap::Parser;
use lmv_translate::cli;
use tracing::error;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    if let Err(err) = cli::dispatch(args) {
        if tracing::dispatcher::has_been_set() {
            error!("{:#}", err);
        } else {
            // Failed before logging was up (bad config, bad workspace).
            eprintln!("error: {:#}", err);
        }
        std::process::exit(1);
    }
    Ok(())
}
