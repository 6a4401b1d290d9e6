use serde::{Serialize, Serializer};
use std::time::Duration;

/// Outcome of one validator invocation. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub name: String,
    pub success: bool,
    pub message: String,
    #[serde(rename = "duration_secs", serialize_with = "serialize_secs")]
    pub duration: Duration,
}

impl ValidationResult {
    pub fn new(
        name: impl Into<String>,
        success: bool,
        message: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            success,
            message: message.into(),
            duration,
        }
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Aggregated outcome of a `ParallelValidator` run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    all_passed: bool,
    results: Vec<ValidationResult>,
    #[serde(rename = "wall_time_secs", serialize_with = "serialize_secs")]
    wall_time: Duration,
    #[serde(rename = "serial_equivalent_secs", serialize_with = "serialize_secs")]
    serial_equivalent: Duration,
    speedup: f64,
}

impl RunReport {
    /// Build a report; results are sorted by name here so every consumer
    /// sees the same order.
    pub fn new(mut results: Vec<ValidationResult>, wall_time: Duration) -> Self {
        results.sort_by(|a, b| a.name.cmp(&b.name));
        let all_passed = results.iter().all(|r| r.success);
        let serial_equivalent = results.iter().map(|r| r.duration).sum::<Duration>();
        let speedup = if wall_time.is_zero() {
            1.0
        } else {
            serial_equivalent.as_secs_f64() / wall_time.as_secs_f64()
        };

        Self {
            all_passed,
            results,
            wall_time,
            serial_equivalent,
            speedup,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.all_passed
    }

    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn wall_time(&self) -> Duration {
        self.wall_time
    }

    /// Sum of every validator's own duration
    pub fn serial_equivalent(&self) -> Duration {
        self.serial_equivalent
    }

    /// Serial-equivalent time divided by wall time
    pub fn speedup(&self) -> f64 {
        self.speedup
    }

    pub fn into_parts(self) -> (bool, Vec<ValidationResult>) {
        (self.all_passed, self.results)
    }
}
