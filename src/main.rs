//! `gattframe` command line tool.
//!
//! Decodes captured response notifications or encodes a response into the
//! notifications a peer would send.

mod cli;

use std::{io, process::ExitCode};

use clap::Parser;

fn main() -> ExitCode {
    // Library code logs through `log` and `tracing`; the binary owns the subscriber.
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = cli::Cli::parse();
    let mut stdout = io::stdout().lock();
    match cli::run(cli.command, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("gattframe: {err}");
            ExitCode::FAILURE
        }
    }
}
