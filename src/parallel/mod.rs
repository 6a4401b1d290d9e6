//! Parallel validation engine
//!
//! Runs many independent, I/O-heavy checks concurrently so a pre-commit hook
//! finishes in roughly the time of its slowest checks instead of their sum.
//!
//! # Architecture Responsibilities
//!
//! ## What This Module Does:
//! - **Bounded execution**: At most `max_workers` validators run at once, pulled
//!   from a crossbeam channel by OS threads
//! - **Fault isolation**: Errors and panics become failed results; the batch always completes
//! - **Deterministic reporting**: Results are sorted by validator name before they are returned
//! - **Timing**: Per-validator durations, wall time, serial-equivalent time and speedup
//!
//! ## What This Module Does NOT Do:
//! - **Validation rules**: Validators are opaque callables (see `crate::checks`)
//! - **Shared data**: Expensive reads go through `crate::cache::CacheManager`
//!
//! # Example Usage
//!
//! ```rust
//! use blogcheck::parallel::{ParallelValidator, Verdict};
//!
//! let mut validator = ParallelValidator::new(4);
//! validator.add_validator("always-ok", || Ok(Verdict::pass("ok"))).unwrap();
//! validator.add_validator("always-bad", || Ok(Verdict::fail("bad"))).unwrap();
//!
//! let (all_passed, results) = validator.run_all().unwrap();
//! assert!(!all_passed);
//! assert_eq!(results[0].name, "always-bad");
//! ```

pub mod pool;
pub mod report;
pub mod validator;

// Re-export main types for easier access
pub use pool::{Outcome, WorkerPool, default_workers};
pub use report::{RunReport, ValidationResult};
pub use validator::{ParallelValidator, ValidatorFn, Verdict};
