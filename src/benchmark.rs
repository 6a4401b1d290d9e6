//! Worker-count sweep for the parallel validator
//!
//! Runs the same workload at several worker counts and reports timing
//! statistics so the concurrency level can be picked from measurements
//! rather than guessed.

use anyhow::Result;
use serde::Serialize;
use std::thread;
use std::time::Duration;

use crate::parallel::{ParallelValidator, Verdict};

/// Mean times within this fraction of the best count as equally fast
const RECOMMENDATION_TOLERANCE: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    pub worker_counts: Vec<usize>,
    pub iterations: usize,
    pub task_timeout: Option<Duration>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            worker_counts: vec![1, 2, 4, 6, 8],
            iterations: 3,
            task_timeout: None,
        }
    }
}

/// Timings for one worker count
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkSample {
    pub workers: usize,
    pub mean_secs: f64,
    pub min_secs: f64,
    pub max_secs: f64,
    /// Mean of serial-equivalent / wall time across iterations
    pub mean_speedup: f64,
    pub all_passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub validators: usize,
    pub iterations: usize,
    pub samples: Vec<BenchmarkSample>,
}

impl BenchmarkReport {
    /// Mean time of the smallest worker count divided by this sample's mean
    pub fn relative_speedup(&self, sample: &BenchmarkSample) -> f64 {
        match self.samples.first() {
            Some(baseline) if sample.mean_secs > 0.0 => baseline.mean_secs / sample.mean_secs,
            _ => 1.0,
        }
    }

    /// Fewest workers whose mean time is within 5% of the fastest mean
    pub fn recommended_workers(&self) -> Option<usize> {
        let best = self
            .samples
            .iter()
            .map(|s| s.mean_secs)
            .min_by(|a, b| a.total_cmp(b))?;
        self.samples
            .iter()
            .find(|s| s.mean_secs <= best * (1.0 + RECOMMENDATION_TOLERANCE))
            .map(|s| s.workers)
    }
}

/// Run `build`'s workload at every configured worker count.
///
/// `build` registers validators on a fresh `ParallelValidator` for every
/// iteration, so per-run state (caches, counters) can be recreated too.
pub fn run_sweep<B>(config: &BenchmarkConfig, build: B) -> Result<BenchmarkReport>
where
    B: Fn(&mut ParallelValidator) -> Result<()>,
{
    if config.iterations == 0 {
        anyhow::bail!("Benchmark needs at least one iteration");
    }

    let mut worker_counts: Vec<usize> = config
        .worker_counts
        .iter()
        .copied()
        .filter(|&w| w > 0)
        .collect();
    worker_counts.sort_unstable();
    worker_counts.dedup();
    if worker_counts.is_empty() {
        anyhow::bail!("Benchmark needs at least one worker count above zero");
    }

    let mut samples = Vec::with_capacity(worker_counts.len());
    let mut validators = 0;

    for workers in worker_counts {
        let mut walls = Vec::with_capacity(config.iterations);
        let mut speedups = Vec::with_capacity(config.iterations);
        let mut all_passed = true;

        for iteration in 0..config.iterations {
            let mut validator =
                ParallelValidator::new(workers).with_task_timeout(config.task_timeout);
            build(&mut validator)?;
            validators = validator.len();

            let report = validator.run()?;
            tracing::debug!(
                "workers={} iteration={} wall={:?} speedup={:.2}",
                workers,
                iteration,
                report.wall_time(),
                report.speedup()
            );
            walls.push(report.wall_time().as_secs_f64());
            speedups.push(report.speedup());
            all_passed &= report.all_passed();
        }

        samples.push(BenchmarkSample {
            workers,
            mean_secs: mean(&walls),
            min_secs: walls.iter().copied().fold(f64::INFINITY, f64::min),
            max_secs: walls.iter().copied().fold(0.0, f64::max),
            mean_speedup: mean(&speedups),
            all_passed,
        });
    }

    Ok(BenchmarkReport {
        validators,
        iterations: config.iterations,
        samples,
    })
}

/// A workload of `count` validators that each sleep for `delay`
pub fn synthetic_workload(
    count: usize,
    delay: Duration,
) -> impl Fn(&mut ParallelValidator) -> Result<()> {
    move |validator: &mut ParallelValidator| {
        for i in 0..count {
            validator.add_validator(format!("synthetic-{i:03}"), move || {
                thread::sleep(delay);
                Ok(Verdict::pass(format!("slept {}ms", delay.as_millis())))
            })?;
        }
        Ok(())
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(workers: usize, mean_secs: f64) -> BenchmarkSample {
        BenchmarkSample {
            workers,
            mean_secs,
            min_secs: mean_secs,
            max_secs: mean_secs,
            mean_speedup: 1.0,
            all_passed: true,
        }
    }

    #[test]
    fn test_recommendation_prefers_fewer_workers_within_tolerance() {
        let report = BenchmarkReport {
            validators: 8,
            iterations: 1,
            samples: vec![sample(1, 8.0), sample(2, 4.0), sample(4, 2.04), sample(8, 2.0)],
        };
        assert_eq!(report.recommended_workers(), Some(4));
        assert!((report.relative_speedup(&report.samples[3]) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_report_has_no_recommendation() {
        let report = BenchmarkReport {
            validators: 0,
            iterations: 1,
            samples: Vec::new(),
        };
        assert_eq!(report.recommended_workers(), None);
    }

    #[test]
    fn test_sweep_over_synthetic_workload() {
        let config = BenchmarkConfig {
            worker_counts: vec![4, 1, 4],
            iterations: 2,
            task_timeout: None,
        };
        let report = run_sweep(&config, synthetic_workload(4, Duration::from_millis(20))).unwrap();

        assert_eq!(report.validators, 4);
        let workers: Vec<usize> = report.samples.iter().map(|s| s.workers).collect();
        assert_eq!(workers, vec![1, 4]);
        assert!(report.samples.iter().all(|s| s.all_passed));
        // Four 20ms sleeps on one worker cannot finish faster than 80ms
        assert!(report.samples[0].min_secs >= 0.08);
        assert!(report.samples[1].mean_secs < report.samples[0].mean_secs);
    }

    #[test]
    fn test_sweep_rejects_bad_config() {
        let no_iterations = BenchmarkConfig {
            iterations: 0,
            ..BenchmarkConfig::default()
        };
        assert!(run_sweep(&no_iterations, synthetic_workload(1, Duration::ZERO)).is_err());

        let no_workers = BenchmarkConfig {
            worker_counts: vec![0],
            ..BenchmarkConfig::default()
        };
        assert!(run_sweep(&no_workers, synthetic_workload(1, Duration::ZERO)).is_err());
    }
}
