//! Entry point of the `switchboardd` daemon.

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match switchboardd::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(target: "switchboardd", error = %error, "daemon exited with an error");
            writeln!(io::stderr().lock(), "switchboardd: {error}").ok();
            ExitCode::FAILURE
        }
    }
}
