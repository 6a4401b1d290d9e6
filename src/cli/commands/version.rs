use anyhow::Result;
use clap::Args;
use std::process::ExitCode;

#[derive(Args)]
pub struct VersionArgs {
    /// Show detailed version information
    #[arg(long)]
    pub detailed: bool,
}

pub fn execute(args: VersionArgs) -> Result<ExitCode> {
    println!("{} {}", crate::PKG_NAME, crate::VERSION);
    if args.detailed {
        println!("Description: {}", crate::PKG_DESCRIPTION);
        println!("Rust Edition: 2024");
        println!("Default workers: {}", crate::parallel::default_workers());
        println!("License: {}", env!("CARGO_PKG_LICENSE"));
    }
    Ok(ExitCode::SUCCESS)
}
