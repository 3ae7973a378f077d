//! depplan - dependency manifest resolver

use std::process::ExitCode;

fn main() -> ExitCode {
    match depplan::cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
