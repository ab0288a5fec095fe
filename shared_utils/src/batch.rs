//! Batch Processing Module
//!
//! File collection for a single input path and the per-run tally of
//! converted / skipped / failed files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Containers the converter looks at (lowercase, no dot).
pub const SUPPORTED_VIDEO_EXTENSIONS: &[&str] =
    &["avi", "mkv", "mp4", "mpg", "mpeg", "mov", "wmv"];

/// Files anywhere under `dir` with one of `extensions`, sorted by path so
/// reruns visit them in the same order.
pub fn collect_files(dir: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| crate::common_utils::has_extension(e.path(), extensions))
        .map(|e| e.path().to_path_buf())
        .collect()
}

/// A file input is taken as-is (the converter classifies its extension),
/// a directory is walked recursively.
pub fn collect_input_files(input: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    if input.is_dir() {
        collect_files(input, extensions)
    } else {
        vec![input.to_path_buf()]
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub total: usize,
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Skip count per reason label.
    pub skip_reasons: BTreeMap<String, usize>,
    /// One summary line per converted file.
    pub converted_files: Vec<String>,
    pub errors: Vec<(PathBuf, String)>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn convert(&mut self, summary: String) {
        self.total += 1;
        self.converted += 1;
        self.converted_files.push(summary);
    }

    pub fn fail(&mut self, path: PathBuf, error: String) {
        self.total += 1;
        self.failed += 1;
        self.errors.push((path, error));
    }

    pub fn skip(&mut self, reason: &str) {
        self.total += 1;
        self.skipped += 1;
        *self.skip_reasons.entry(reason.to_string()).or_insert(0) += 1;
    }
}
