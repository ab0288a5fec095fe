//! Report Module
//!
//! End-of-run summary. Everything goes through `tracing` so `--log` captures
//! the report together with the per-file lines.

use crate::batch::BatchResult;
use std::time::Duration;
use tracing::info;

/// `dd:hh:mm:ss`
pub fn format_elapsed(duration: Duration) -> String {
    let secs = duration.as_secs();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

/// Lines of the summary, without emitting them.
pub fn summary_lines(
    result: &BatchResult,
    duration: Duration,
    encoder_threads: Option<usize>,
    dry_run: bool,
) -> Vec<String> {
    let mut lines = Vec::new();

    if !result.converted_files.is_empty() {
        lines.push(String::new());
        lines.push("Converted files:".to_string());
        lines.extend(result.converted_files.iter().map(|f| format!(" {}", f)));
    }

    if !result.errors.is_empty() {
        lines.push(String::new());
        lines.push("Failed files:".to_string());
        lines.extend(
            result
                .errors
                .iter()
                .map(|(path, error)| format!(" {} ({})", path.display(), error)),
        );
    }

    lines.push(String::new());
    lines.push("Summary:".to_string());
    lines.push(format!("  Total files checked: {}", result.total));
    lines.push(format!("  Converted: {}", result.converted));
    lines.push(format!("  Skipped: {}", result.skipped));
    for (reason, count) in &result.skip_reasons {
        lines.push(format!("    {}: {}", reason, count));
    }
    lines.push(format!("  Failed: {}", result.failed));
    match encoder_threads {
        Some(n) => lines.push(format!("  Using {} threads for conversion.", n)),
        None => lines.push("  Encoder multithreading disabled.".to_string()),
    }
    lines.push(format!(
        "  Total elapsed time (d:hh:mm:ss): {}",
        format_elapsed(duration)
    ));

    if dry_run {
        lines.push(String::new());
        lines.push("DRY RUN: No files were actually converted.".to_string());
    }

    lines
}

pub fn print_summary_report(
    result: &BatchResult,
    duration: Duration,
    encoder_threads: Option<usize>,
    dry_run: bool,
) {
    for line in summary_lines(result, duration, encoder_threads, dry_run) {
        info!("{}", line);
    }
}
