use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use crate::benchmark::{BenchmarkConfig, BenchmarkReport, run_sweep, synthetic_workload};
use crate::cache::{CacheManager, CacheSettings};
use crate::checks::{CheckContext, register_builtin};
use crate::cli::{Output, OutputFormat};
use crate::config::BlogcheckConfig;
use crate::parallel::ParallelValidator;

#[derive(Args, Debug)]
pub struct BenchArgs {
    /// Worker counts to compare
    #[arg(short, long, value_delimiter = ',', default_values_t = [1, 2, 4, 6, 8])]
    pub workers: Vec<usize>,

    /// Runs per worker count
    #[arg(short = 'n', long, default_value_t = 3)]
    pub iterations: usize,

    /// Benchmark N sleeping validators instead of the built-in checks
    #[arg(long, value_name = "N")]
    pub synthetic: Option<usize>,

    /// Sleep per synthetic validator in milliseconds
    #[arg(long, default_value_t = 100)]
    pub delay_ms: u64,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn execute(args: BenchArgs, custom_config: Option<&Path>, output: &Output) -> Result<ExitCode> {
    let config = BlogcheckConfig::load_with_custom_config(custom_config)?;
    let bench = BenchmarkConfig {
        worker_counts: args.workers.clone(),
        iterations: args.iterations,
        task_timeout: config.parallel.task_timeout(),
    };

    let report = match args.synthetic {
        Some(count) => {
            if args.format == OutputFormat::Text {
                output.info(&format!(
                    "Benchmarking {} synthetic validators sleeping {}ms each",
                    count, args.delay_ms
                ));
            }
            run_sweep(&bench, synthetic_workload(count, Duration::from_millis(args.delay_ms)))?
        }
        None => {
            if args.format == OutputFormat::Text {
                output.info(&format!(
                    "Benchmarking built-in checks on {}",
                    config.posts.dir.display()
                ));
            }
            let settings = CacheSettings::from_config(&config.cache, &config.posts.patterns);
            // Fresh caches every iteration so each run pays for its own reads
            run_sweep(&bench, |validator: &mut ParallelValidator| {
                let cache = Arc::new(CacheManager::new(settings.clone())?);
                let ctx = CheckContext::new(&config.posts.dir, cache, config.checks.clone())?;
                let ctx = Arc::new(ctx);
                register_builtin(validator, ctx)
            })?
        }
    };

    match args.format {
        OutputFormat::Json => {
            let mut value = serde_json::to_value(&report).context("Failed to serialize benchmark")?;
            value["recommended_workers"] = serde_json::to_value(report.recommended_workers())?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => print_table(&report, output),
    }

    Ok(ExitCode::SUCCESS)
}

fn print_table(report: &BenchmarkReport, output: &Output) {
    output.header(&format!(
        "{} validators, {} iterations per worker count",
        report.validators, report.iterations
    ));
    output.block(&format!(
        "{:>8} {:>9} {:>9} {:>9} {:>9} {:>9}\n",
        "workers", "mean", "min", "max", "speedup", "vs first"
    ));
    for sample in &report.samples {
        output.block(&format!(
            "{:>8} {:>8.3}s {:>8.3}s {:>8.3}s {:>8.2}x {:>8.2}x\n",
            sample.workers,
            sample.mean_secs,
            sample.min_secs,
            sample.max_secs,
            sample.mean_speedup,
            report.relative_speedup(sample)
        ));
        if !sample.all_passed {
            output.warning(&format!("Some validators failed with {} workers", sample.workers));
        }
    }
    output.separator();

    if let Some(workers) = report.recommended_workers() {
        output.success(&format!("Recommended workers: {workers}"));
    }
}
