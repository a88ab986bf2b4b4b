//! regidb CLI entry point
//!
//! Minimal entrypoint: argument parsing, dispatch, and subsystem wiring all
//! live in the cli module. This only reports errors and sets the exit code.

use regidb::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
