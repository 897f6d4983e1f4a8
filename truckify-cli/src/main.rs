//! Entry point for the `truckify` command-line interface.
#![forbid(unsafe_code)]

use std::process::ExitCode;

use truckify_cli::CliError;

#[expect(
    clippy::print_stderr,
    reason = "the binary reports fatal errors on stderr"
)]
fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    match truckify_cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("truckify: {err}");
            ExitCode::FAILURE
        }
    }
}
