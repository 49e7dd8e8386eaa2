use glob::{glob_with, MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Suffix of usage log files.
pub const LOG_FILE_EXTENSION: &str = "jsonl";

/// Handles file system traversal and discovery of Claude usage data files
pub struct FileDiscovery;

impl FileDiscovery {
    /// Find every `*.jsonl` file under `root`, recursively, sorted by path.
    ///
    /// A missing root is not an error: it logs a warning and returns nothing.
    pub fn find_jsonl_files(root: &Path) -> Vec<PathBuf> {
        if !root.exists() {
            warn!(path = %root.display(), "Data path does not exist");
            return Vec::new();
        }

        let escaped_root = Pattern::escape(&root.to_string_lossy());
        let pattern = Path::new(&escaped_root)
            .join("**")
            .join(format!("*.{}", LOG_FILE_EXTENSION));

        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };

        let mut files: Vec<PathBuf> = match glob_with(&pattern.to_string_lossy(), options) {
            Ok(paths) => paths
                .filter_map(|entry| match entry {
                    Ok(path) => Some(path),
                    Err(e) => {
                        debug!(error = %e, "Skipping unreadable path during discovery");
                        None
                    }
                })
                .filter(|path| path.is_file())
                .collect(),
            Err(e) => {
                warn!(path = %root.display(), error = %e, "Invalid discovery pattern");
                Vec::new()
            }
        };

        files.sort();
        files.dedup();
        debug!(root = %root.display(), files = files.len(), "Discovered log files");
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "{}\n").unwrap();
    }

    #[test]
    fn test_find_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("b.jsonl"));
        touch(&dir.path().join("a.jsonl"));
        touch(&dir.path().join("project-x").join("session").join("c.jsonl"));
        touch(&dir.path().join("notes.txt"));

        let files = FileDiscovery::find_jsonl_files(dir.path());
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(files.len(), 3);
        assert_eq!(names[0], "a.jsonl");
        assert_eq!(names[1], "b.jsonl");
        assert!(names[2].ends_with("c.jsonl"));
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let files = FileDiscovery::find_jsonl_files(&dir.path().join("does-not-exist"));
        assert!(files.is_empty());
    }

    #[test]
    fn test_root_with_glob_metacharacters() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("data[1]");
        touch(&root.join("usage.jsonl"));

        let files = FileDiscovery::find_jsonl_files(&root);
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_directories_named_like_logs_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("weird.jsonl")).unwrap();
        touch(&dir.path().join("real.jsonl"));

        let files = FileDiscovery::find_jsonl_files(dir.path());
        assert_eq!(files.len(), 1);
    }
}
