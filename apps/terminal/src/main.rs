//! # Tally Scan Station Entry Point
//!
//! ```bash
//! # Use the platform config and data directories
//! cargo run -p tally-terminal
//!
//! # Explicit store, e.g. one filled by the seed binary
//! cargo run -p tally-terminal -- --db ./tally_dev.db
//! ```
//!
//! The actual setup is in lib.rs for better testability.

use tally_terminal::{run, CliOptions, USAGE};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = CliOptions::parse(std::env::args())?;

    if options.show_help {
        print!("{}", USAGE);
        return Ok(());
    }

    run(options).await?;
    Ok(())
}
