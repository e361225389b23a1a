//! # apigentools CLI
//!
//! This is the binary entry point for the `apigentools` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Initializing logging.
//! - Executing the appropriate command and mapping its result to a process
//!   exit code (commands that iterate multiple (language, version) pairs
//!   accumulate failures and report an aggregate nonzero code).
//!
//! The core application logic is defined in the `lib.rs` library crate,
//! ensuring that the binary is a thin wrapper around the reusable library
//! functionality.

use clap::Parser;

use apigentools::cli::Cli;

fn main() {
    let cli = Cli::parse();
    cli.init_logging();

    match cli.execute() {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(error) => {
            log::error!("{:#}", error);
            std::process::exit(1);
        }
    }
}
