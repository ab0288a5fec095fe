//! CLI Runner Module
//!
//! Sequential batch driver shared by the tool binaries: collects the input
//! files, hands each one to a per-file callback and prints the summary
//! report at the end.

use crate::batch::{collect_input_files, BatchResult};
use crate::report::print_summary_report;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info};

pub trait CliProcessingResult {
    /// `Some(reason)` when the file was left untouched.
    fn skip_reason(&self) -> Option<&str>;
    /// Line for the "Converted files" list.
    fn summary(&self) -> String;
}

pub struct CliRunnerConfig {
    pub input: PathBuf,
    pub extensions: &'static [&'static str],
    pub label: String,
    pub encoder_threads: Option<usize>,
    pub dry_run: bool,
}

/// Feeds every collected file to `converter`, one at a time. A failing file
/// is recorded and the batch moves on; nothing is retried.
pub fn run_batch<F, R>(config: &CliRunnerConfig, mut converter: F) -> BatchResult
where
    F: FnMut(&Path) -> Result<R>,
    R: CliProcessingResult,
{
    let files = collect_input_files(&config.input, config.extensions);
    debug!(count = files.len(), input = %config.input.display(), "Collected files");

    let mut batch_result = BatchResult::new();
    for file in &files {
        match converter(file) {
            Ok(result) => match result.skip_reason() {
                Some(reason) => batch_result.skip(reason),
                None => batch_result.convert(result.summary()),
            },
            Err(e) => {
                error!(" !!! Error processing file {}: {:#}", file.display(), e);
                batch_result.fail(file.clone(), format!("{:#}", e));
            }
        }
    }
    batch_result
}

/// Runs the batch and prints the summary report.
pub fn run_auto_command<F, R>(config: CliRunnerConfig, converter: F) -> Result<BatchResult>
where
    F: FnMut(&Path) -> Result<R>,
    R: CliProcessingResult,
{
    if !config.input.exists() {
        anyhow::bail!("Input path does not exist: {}", config.input.display());
    }

    info!("{}: processing {}", config.label, config.input.display());
    let start_time = Instant::now();
    let result = run_batch(&config, converter);

    print_summary_report(
        &result,
        start_time.elapsed(),
        config.encoder_threads,
        config.dry_run,
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::SUPPORTED_VIDEO_EXTENSIONS;
    use std::fs;
    use tempfile::TempDir;

    struct Outcome(Option<&'static str>);

    impl CliProcessingResult for Outcome {
        fn skip_reason(&self) -> Option<&str> {
            self.0
        }
        fn summary(&self) -> String {
            "converted".to_string()
        }
    }

    fn config(input: &Path) -> CliRunnerConfig {
        CliRunnerConfig {
            input: input.to_path_buf(),
            extensions: SUPPORTED_VIDEO_EXTENSIONS,
            label: "test".to_string(),
            encoder_threads: Some(2),
            dry_run: false,
        }
    }

    #[test]
    fn test_failure_does_not_halt_batch() {
        let dir = TempDir::new().unwrap();
        for name in ["a.avi", "b.avi", "c.avi"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let mut visited = Vec::new();
        let result = run_batch(&config(dir.path()), |file| {
            let name = file.file_name().unwrap().to_string_lossy().into_owned();
            visited.push(name.clone());
            match name.as_str() {
                "a.avi" => Ok(Outcome(None)),
                "b.avi" => anyhow::bail!("encoder exited with 1"),
                _ => Ok(Outcome(Some("output exists"))),
            }
        });

        assert_eq!(visited, vec!["a.avi", "b.avi", "c.avi"]);
        assert_eq!(result.converted, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.skipped, 1);
        assert!(result.errors[0].1.contains("encoder exited with 1"));
    }

    #[test]
    fn test_missing_input_is_fatal() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let outcome = run_auto_command(config(&missing), |_| Ok(Outcome(None)));
        assert!(outcome.is_err());
    }
}
