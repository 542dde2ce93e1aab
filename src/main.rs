use std::process::ExitCode;

use clap::Parser;
use gridmux::config::Config;

fn main() -> ExitCode {
    let config = Config::parse();
    match gridmux::runner::run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("gridmux: {err}");
            ExitCode::FAILURE
        }
    }
}
