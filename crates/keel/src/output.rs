//! Terminal output utilities

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use keel_platform::{Diagnostics, Severity};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").red().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("⚠").yellow().bold(), msg);
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", style(key).dim(), value);
}

/// Print every diagnostic, errors in red
pub fn diagnostics(diags: &Diagnostics) {
    for diag in diags {
        let line = format!("{}: {}", diag.summary, diag.detail);
        match diag.severity {
            Severity::Error => error(&line),
            Severity::Warning => warning(&line),
        }
    }
}

/// Create a spinner, or a hidden bar when output is suppressed
pub fn spinner(msg: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(template.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
