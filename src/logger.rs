//! Logging utilities with colored module prefixes.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - [`Warnings`] for tallying recoverable conditions per build
//!
//! # Example
//!
//! ```ignore
//! log!("build"; "built {} files", count);
//!
//! let warnings = Warnings::new();
//! warnings.emit("layout base.js not found");
//! assert_eq!(warnings.count(), 1);
//! ```

use colored::{ColoredString, Colorize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Log a message with a colored module prefix.
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a message with a colored module prefix.
pub fn log(module: &str, message: &str) {
    println!("{} {message}", colorize_prefix(module));
}

/// Apply color to a module prefix based on module type.
#[inline]
fn colorize_prefix(module: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module {
        "error" => prefix.bright_red().bold(),
        "warn" => prefix.bright_red(),
        _ => prefix.bright_yellow().bold(),
    }
}

// ============================================================================
// Warning Tally
// ============================================================================

/// Counts warnings emitted during one build.
///
/// Recoverable conditions (missing data export, unresolvable layout link,
/// a cycle in a layout chain) are logged and tallied here instead of
/// aborting the build. The count ends up in the build report, so tests can
/// observe degradation without inspecting terminal output.
#[derive(Debug, Default)]
pub struct Warnings(AtomicUsize);

impl Warnings {
    pub fn new() -> Self {
        Self(AtomicUsize::new(0))
    }

    /// Log a warning and increment the tally.
    pub fn emit(&self, message: &str) {
        log("warn", message);
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of warnings emitted so far.
    pub fn count(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}
