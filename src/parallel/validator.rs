use super::pool::{Outcome, WorkerPool, default_workers};
use super::report::{RunReport, ValidationResult};
use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The answer a validator gives when it runs to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub success: bool,
    pub message: String,
}

impl Verdict {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl From<(bool, String)> for Verdict {
    fn from((success, message): (bool, String)) -> Self {
        Self { success, message }
    }
}

impl From<(bool, &str)> for Verdict {
    fn from((success, message): (bool, &str)) -> Self {
        Self {
            success,
            message: message.to_string(),
        }
    }
}

/// A registered unit of work. Returning `Err` marks the validator as failed
/// with an `Exception: ` message instead of aborting the batch.
pub type ValidatorFn = Arc<dyn Fn() -> Result<Verdict> + Send + Sync>;

struct RegisteredValidator {
    name: String,
    func: ValidatorFn,
}

/// Runs named validators concurrently on a bounded worker pool and
/// aggregates their results.
///
/// Results are always returned sorted by validator name, regardless of the
/// order in which validators finish.
pub struct ParallelValidator {
    max_workers: usize,
    task_timeout: Option<Duration>,
    verbose: bool,
    validators: Vec<RegisteredValidator>,
}

impl Default for ParallelValidator {
    fn default() -> Self {
        Self::new(default_workers())
    }
}

impl ParallelValidator {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            task_timeout: None,
            verbose: false,
            validators: Vec::new(),
        }
    }

    /// Fail any validator still running after `timeout`.
    ///
    /// Without a timeout a validator that never returns stalls `run_all`.
    /// A zero timeout means no timeout.
    pub fn with_task_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.task_timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    /// Log every result as it completes plus a timing summary at the end
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Registered names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.validators.iter().map(|v| v.name.as_str())
    }

    /// Register a validator under a unique, non-empty name
    pub fn add_validator<F>(&mut self, name: impl Into<String>, func: F) -> Result<()>
    where
        F: Fn() -> Result<Verdict> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            anyhow::bail!("Validator name cannot be empty");
        }
        if self.validators.iter().any(|v| v.name == name) {
            anyhow::bail!("Validator '{}' is already registered", name);
        }

        self.validators.push(RegisteredValidator {
            name,
            func: Arc::new(func),
        });
        Ok(())
    }

    /// Run every validator and return `(all_passed, results sorted by name)`
    pub fn run_all(&self) -> Result<(bool, Vec<ValidationResult>)> {
        Ok(self.run()?.into_parts())
    }

    /// Run every validator and return the full report with timing data
    pub fn run(&self) -> Result<RunReport> {
        if self.validators.is_empty() {
            return Ok(RunReport::new(Vec::new(), Duration::ZERO));
        }

        let work_items: Vec<(String, ValidatorFn)> = self
            .validators
            .iter()
            .map(|v| (v.name.clone(), v.func.clone()))
            .collect();
        let names: Vec<String> = work_items.iter().map(|(name, _)| name.clone()).collect();

        let pool = WorkerPool::new(self.max_workers)
            .with_task_timeout(self.task_timeout)
            .with_thread_name("validator");

        tracing::debug!(
            "Running {} validators on {} workers",
            work_items.len(),
            pool.max_workers().min(work_items.len())
        );

        let verbose = self.verbose;
        let started = Instant::now();
        let outcomes = pool.execute(
            work_items,
            |(name, func)| run_one(name, &func),
            |index, outcome| {
                if verbose {
                    log_completion(&names[index], outcome);
                }
            },
        )?;
        let wall_time = started.elapsed();

        let results = outcomes
            .into_iter()
            .zip(names.iter())
            .map(|(outcome, name)| into_result(name, outcome))
            .collect();
        let report = RunReport::new(results, wall_time);

        if verbose {
            tracing::info!(
                "Ran {} validators in {:.2}s (serial equivalent {:.2}s, speedup {:.2}x)",
                report.results().len(),
                report.wall_time().as_secs_f64(),
                report.serial_equivalent().as_secs_f64(),
                report.speedup()
            );
        }

        Ok(report)
    }
}

/// Invoke one validator, timing it and converting errors into failed results
fn run_one(name: String, func: &ValidatorFn) -> ValidationResult {
    let started = Instant::now();
    let verdict = func();
    let duration = started.elapsed();

    match verdict {
        Ok(verdict) => ValidationResult::new(name, verdict.success, verdict.message, duration),
        Err(e) => ValidationResult::new(name, false, format!("Exception: {e:#}"), duration),
    }
}

fn into_result(name: &str, outcome: Outcome<ValidationResult>) -> ValidationResult {
    match outcome {
        Outcome::Completed(result) => result,
        Outcome::Panicked { message, elapsed } => {
            ValidationResult::new(name, false, format!("Exception: {message}"), elapsed)
        }
        Outcome::TimedOut { elapsed } => ValidationResult::new(
            name,
            false,
            format!("Timed out after {:.1}s", elapsed.as_secs_f64()),
            elapsed,
        ),
    }
}

fn log_completion(name: &str, outcome: &Outcome<ValidationResult>) {
    match outcome {
        Outcome::Completed(result) => {
            let status = if result.success { "PASS" } else { "FAIL" };
            tracing::info!(
                "{} {} ({:.2}s) {}",
                status,
                name,
                result.duration.as_secs_f64(),
                result.message
            );
        }
        Outcome::Panicked { message, elapsed } => {
            tracing::info!("FAIL {} ({:.2}s) panicked: {}", name, elapsed.as_secs_f64(), message);
        }
        Outcome::TimedOut { elapsed } => {
            tracing::info!("FAIL {} timed out after {:.2}s", name, elapsed.as_secs_f64());
        }
    }
}
