//! `ke24` binary entry point.
//!
//! Exit codes: 0 on success or help, 1 on any configuration, resolution
//! or execution failure, 2 on a command line usage error.

use std::process::ExitCode;

fn main() -> ExitCode {
    // clap prints usage and exits with 2 on invalid flags.
    let matches = ke24_cli::command().get_matches();

    let parsed = match ke24_cli::parse(&matches) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };

    match ke24_cli::run(&parsed) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
