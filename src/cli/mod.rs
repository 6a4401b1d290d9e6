//! Command-line interface for blogcheck
//!
//! clap derive structures, logging setup and dispatch to the subcommands.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

pub mod commands;
mod output;

pub use output::{Output, format_secs};

#[derive(Parser)]
#[command(
    name = "blogcheck",
    version = env!("CARGO_PKG_VERSION"),
    about = "Parallel pre-commit validation for blog posts",
    long_about = "blogcheck runs independent post validators on a bounded worker pool. \
                  Validators share frontmatter, HTTP and directory caches so each file, \
                  listing and link is read once per run."
)]
pub struct Cli {
    /// Run as if started in <DIR> instead of current working directory
    #[arg(short = 'C', long = "directory", global = true)]
    pub directory: Option<PathBuf>,

    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use custom configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every enabled validator against the posts directory
    Check(commands::check::CheckArgs),
    /// Compare validator run times across worker counts
    Bench(commands::bench::BenchArgs),
    /// Configuration management
    Config(commands::config::ConfigArgs),
    /// Show version information
    Version(commands::version::VersionArgs),
}

/// Report format for `check` and `bench`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl Cli {
    pub fn run(self) -> Result<ExitCode> {
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)
                .with_context(|| format!("Cannot change directory to {}", dir.display()))?;
        }

        setup_logging(self.verbose, self.quiet);

        let output = Output::new(self.verbose > 0, self.quiet);
        let config = self.config.as_deref();

        match self.command {
            Some(Commands::Check(args)) => commands::check::execute(args, config, &output),
            Some(Commands::Bench(args)) => commands::bench::execute(args, config, &output),
            Some(Commands::Config(args)) => commands::config::execute(args, config, &output),
            Some(Commands::Version(args)) => commands::version::execute(args),
            None => {
                Cli::command().print_help()?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info,ignore=warn,globset=warn,reqwest=warn"),
            2 => tracing_subscriber::EnvFilter::new(
                "debug,ignore=warn,globset=warn,hyper_util=info",
            ),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    // Logs go to stderr so `--format json` stays machine-readable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(console::colors_enabled_stderr())
        .with_writer(std::io::stderr)
        .try_init();
}
