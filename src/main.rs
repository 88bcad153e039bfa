use clap::Parser;
use std::process::ExitCode;

use instaedit::cli;

fn main() -> ExitCode {
    instaedit::logger::init();
    cli::run(cli::CliArgs::parse())
}
