//! Styled terminal output for blogcheck
//!
//! Keeps the symbols and colours consistent across commands. Everything but
//! errors and failures is suppressed in quiet mode.

use console::style;
use std::time::Duration;

use crate::parallel::ValidationResult;

/// Output handler for consistent CLI formatting
pub struct Output {
    verbose: bool,
    quiet: bool,
}

impl Output {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✔").green(), message);
        }
    }

    /// Errors are always shown, even in quiet mode
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✖").red(), message);
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("⚠").yellow(), message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn header(&self, title: &str) {
        if !self.quiet {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    /// One PASS/FAIL line per validator. Failures print even when quiet.
    pub fn validation_result(&self, result: &ValidationResult) {
        if result.success {
            if !self.quiet {
                println!(
                    "{} {} {} {}",
                    style("PASS").green().bold(),
                    style(&result.name).bold(),
                    style(format_secs(result.duration)).dim(),
                    result.message
                );
            }
        } else {
            println!(
                "{} {} {} {}",
                style("FAIL").red().bold(),
                style(&result.name).bold(),
                style(format_secs(result.duration)).dim(),
                style(&result.message).red()
            );
        }
    }

    pub fn key_value(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {:<20} {}", style(key).dim(), value);
        }
    }

    /// Pre-formatted block, printed as is
    pub fn block(&self, text: &str) {
        if !self.quiet {
            print!("{text}");
        }
    }

    pub fn separator(&self) {
        if !self.quiet {
            println!("{}", style("─".repeat(50)).dim());
        }
    }
}

/// `(0.42s)`
pub fn format_secs(duration: Duration) -> String {
    format!("({:.2}s)", duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_secs() {
        assert_eq!(format_secs(Duration::from_millis(1250)), "(1.25s)");
        assert_eq!(format_secs(Duration::ZERO), "(0.00s)");
    }
}
