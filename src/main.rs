//! # Scanlens Command-Line Entry Point
//!
//! ```text
//! main()
//!   │
//!   ├─> Parse CLI arguments (clap)
//!   ├─> Install the tracing subscriber (stderr, optional rolling file)
//!   ├─> Create Tokio runtime
//!   └─> Execute the subcommand, printing its result to stdout
//! ```
//!
//! ```bash
//! scanlens describe --project my-project --dataset thelook --block orders --ddls
//! scanlens table --project my-project --dataset thelook --table users
//! scanlens scans --project my-project --dataset thelook -v
//! ```

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout)] // Results go to stdout

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let log_dir = if cli.log_file {
        Some(scanlens::logging::get_log_dir()?)
    } else {
        None
    };
    // Held until exit so the file writer flushes.
    let _log_guard = scanlens::logging::init(cli.verbose, log_dir.as_deref())?;

    tokio::runtime::Runtime::new()?.block_on(cli::run_command(cli.command))
}
