use clap::Parser;
use console::style;
use std::process::ExitCode;

use blogcheck::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", style("✖").red(), e);
            ExitCode::FAILURE
        }
    }
}
