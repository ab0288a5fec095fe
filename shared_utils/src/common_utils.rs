//! Common Utilities Module
//!
//! Path helpers shared by the walker, the converter and the subtitle pipeline.

use std::path::{Path, PathBuf};

/// Prefix of every file this tool writes; doubles as the resumability marker.
pub const CONVERTED_PREFIX: &str = "conv-";

/// Lowercased extension without the dot, empty when there is none.
///
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::get_extension_lowercase;
///
/// assert_eq!(get_extension_lowercase(Path::new("Movie.MKV")), "mkv");
/// assert_eq!(get_extension_lowercase(Path::new("noext")), "");
/// ```
pub fn get_extension_lowercase(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Case-insensitive extension check; `extensions` are given without dots.
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    let ext = get_extension_lowercase(path);
    extensions.contains(&ext.as_str())
}

pub fn file_stem_lossy(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// True for files this tool produced (`conv-*`).
pub fn has_converted_prefix(path: &Path) -> bool {
    file_name_lossy(path).starts_with(CONVERTED_PREFIX)
}

/// `dir/movie.avi` + `mp4` → `dir/conv-movie.mp4`
pub fn converted_output_path(input: &Path, extension: &str) -> PathBuf {
    input.with_file_name(format!(
        "{}{}.{}",
        CONVERTED_PREFIX,
        file_stem_lossy(input),
        extension
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_extension_case_insensitive() {
        let exts = &["avi", "mkv"];
        assert!(has_extension(Path::new("a.AVI"), exts));
        assert!(has_extension(Path::new("dir/b.mkv"), exts));
        assert!(!has_extension(Path::new("c.srt"), exts));
        assert!(!has_extension(Path::new("mkv"), exts));
    }

    #[test]
    fn test_converted_prefix() {
        assert!(has_converted_prefix(Path::new("/x/conv-movie.mkv")));
        assert!(!has_converted_prefix(Path::new("/x/movie-conv-.mkv")));
    }

    #[test]
    fn test_converted_output_path() {
        assert_eq!(
            converted_output_path(Path::new("/media/The.Movie.avi"), "mp4"),
            PathBuf::from("/media/conv-The.Movie.mp4")
        );
    }
}
