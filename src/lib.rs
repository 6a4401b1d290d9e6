//! # blogcheck - parallel pre-commit validation for a Markdown blog
//!
//! Runs a set of independent validators over a posts directory on a bounded
//! worker pool, sharing one cache layer so that files, directory listings and
//! HTTP responses are read once per run no matter how many validators need
//! them.
//!
//! ## Features
//!
//! - **Parallel engine**: [`ParallelValidator`] runs registered validators on a
//!   worker pool and turns errors, panics and timeouts into failed results
//! - **Shared caches**: [`CacheManager`] holds frontmatter, HTTP and directory
//!   discovery caches with hit/miss statistics
//! - **Benchmark harness**: [`benchmark::run_sweep`] measures the engine at
//!   several worker counts
//!
//! ## Quick Start
//!
//! ```bash
//! # Validate posts under src/posts
//! blogcheck check
//!
//! # Compare worker counts
//! blogcheck bench --workers 1,2,4,6,8 --iterations 5
//! ```

pub mod benchmark;
pub mod cache;
pub mod checks;
pub mod cli;
pub mod config;
pub mod parallel;

pub use cache::CacheManager;
pub use cli::{Cli, Output};
pub use config::BlogcheckConfig;
pub use parallel::{ParallelValidator, ValidationResult, Verdict};

/// Result type alias for blogcheck operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
