use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::cache::{CacheManager, CacheSettings};
use crate::checks::{CheckContext, register_builtin};
use crate::cli::{Output, OutputFormat, format_secs};
use crate::config::BlogcheckConfig;
use crate::parallel::ParallelValidator;

#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Posts directory (overrides posts.dir)
    #[arg(long, value_name = "DIR")]
    pub posts_dir: Option<PathBuf>,

    /// Worker threads, 0 for automatic (overrides parallel.max_workers)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Per-validator timeout in seconds, 0 to disable
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Also fetch every external link in post bodies
    #[arg(long)]
    pub check_links: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Print cache hit/miss statistics after the run
    #[arg(long)]
    pub cache_stats: bool,
}

impl CheckArgs {
    /// Command-line flags win over every config layer
    pub fn apply(&self, config: &mut BlogcheckConfig) {
        if let Some(dir) = &self.posts_dir {
            config.posts.dir = dir.clone();
        }
        if let Some(workers) = self.workers {
            config.parallel.max_workers = workers;
        }
        if let Some(timeout) = self.timeout {
            config.parallel.task_timeout_secs = timeout;
        }
        if self.check_links {
            config.checks.external_links = true;
        }
    }
}

pub fn execute(args: CheckArgs, custom_config: Option<&Path>, output: &Output) -> Result<ExitCode> {
    let mut config = BlogcheckConfig::load_with_custom_config(custom_config)?;
    args.apply(&mut config);
    config.validate()?;

    let cache = Arc::new(CacheManager::new(CacheSettings::from_config(
        &config.cache,
        &config.posts.patterns,
    ))?);
    let ctx = Arc::new(CheckContext::new(&config.posts.dir, cache.clone(), config.checks.clone())?);

    let mut validator = ParallelValidator::new(config.parallel.effective_workers())
        .with_task_timeout(config.parallel.task_timeout())
        .verbose(output.is_verbose());
    register_builtin(&mut validator, ctx)?;

    let text = args.format == OutputFormat::Text;
    if text {
        output.info(&format!(
            "Running {} validators on {} workers in {}",
            validator.len(),
            validator.max_workers(),
            config.posts.dir.display()
        ));
    }

    let report = validator.run()?;

    match args.format {
        OutputFormat::Json => {
            let mut value = serde_json::to_value(&report).context("Failed to serialize report")?;
            if args.cache_stats {
                value["cache_stats"] = serde_json::to_value(cache.stats())?;
            }
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            for result in report.results() {
                output.validation_result(result);
            }
            output.separator();

            let passed = report.results().len() - report.failures().count();
            let summary = format!(
                "{}/{} validators passed {} (serial {:.2}s, {:.1}x speedup)",
                passed,
                report.results().len(),
                format_secs(report.wall_time()),
                report.serial_equivalent().as_secs_f64(),
                report.speedup()
            );
            if report.all_passed() {
                output.success(&summary);
            } else {
                output.error(&summary);
            }

            if args.cache_stats {
                output.header("Cache statistics");
                output.block(&cache.stats().to_string());
            }
        }
    }

    Ok(if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = CheckArgs {
            posts_dir: Some(PathBuf::from("content")),
            workers: Some(2),
            timeout: Some(30),
            check_links: true,
            ..CheckArgs::default()
        };
        let mut config = BlogcheckConfig::default();
        args.apply(&mut config);

        assert_eq!(config.posts.dir, PathBuf::from("content"));
        assert_eq!(config.parallel.max_workers, 2);
        assert_eq!(config.parallel.task_timeout_secs, 30);
        assert!(config.checks.external_links);
    }

    #[test]
    fn test_absent_flags_keep_config() {
        let mut config = BlogcheckConfig::default();
        CheckArgs::default().apply(&mut config);
        assert_eq!(config, BlogcheckConfig::default());
    }
}
