use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::Path;
use std::process::ExitCode;

use crate::cli::Output;
use crate::config::BlogcheckConfig;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Display current merged configuration
    Show {
        /// Output format: toml, json, yaml
        #[arg(short, long, default_value = "toml")]
        format: String,
    },
    /// Validate the merged configuration
    Validate,
}

pub fn execute(
    args: ConfigArgs,
    custom_config: Option<&Path>,
    output: &Output,
) -> Result<ExitCode> {
    match args.command {
        ConfigCommand::Show { format } => {
            let config = BlogcheckConfig::load_with_custom_config(custom_config)?;
            println!("{}", config.render(&format.to_lowercase())?);
        }
        ConfigCommand::Validate => {
            let config = BlogcheckConfig::load_with_custom_config(custom_config)?;
            output.success("Configuration is valid");
            output.key_value("posts.dir", &config.posts.dir.display().to_string());
            output.key_value("posts.patterns", &config.posts.patterns.join(", "));
            output.key_value("workers", &config.parallel.effective_workers().to_string());
            let timeout = config
                .parallel
                .task_timeout()
                .map_or_else(|| "none".to_string(), |t| format!("{}s", t.as_secs()));
            output.key_value("task timeout", &timeout);
        }
    }
    Ok(ExitCode::SUCCESS)
}
