//! Input resolution: glob patterns to absolute tx3 source paths

use glob::{MatchOptions, Pattern};
use std::collections::HashSet;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use crate::generation::GenerationError;

/// Makes `pattern` absolute against `root`.
///
/// The root portion is glob-escaped so directories such as `[app]` are taken
/// literally; only the user's pattern carries wildcards.
pub fn absolute_pattern(pattern: &str, root: &Path) -> Result<String, GenerationError> {
    if Path::new(pattern).is_absolute() {
        return Ok(pattern.to_string());
    }

    let root = root.to_str().ok_or_else(|| GenerationError::InvalidPattern {
        pattern: pattern.to_string(),
        message: format!("project root {} is not valid UTF-8", root.display()),
    })?;
    let relative = pattern.strip_prefix("./").unwrap_or(pattern);

    Ok(format!(
        "{}{}{}",
        Pattern::escape(root.trim_end_matches(MAIN_SEPARATOR)),
        MAIN_SEPARATOR,
        relative
    ))
}

/// Expands already-absolute patterns, flattening matches in pattern order.
///
/// Duplicates keep their first position. A pattern matching nothing
/// contributes nothing; deciding whether an empty result is an error is left
/// to the caller. Entries that cannot be read while walking are skipped.
pub fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>, GenerationError> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for pattern in patterns {
        let entries = glob::glob(pattern).map_err(|e| GenerationError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(
                        path = %e.path().display(),
                        error = %e.error(),
                        "Skipping unreadable path while resolving tx3 inputs"
                    );
                    continue;
                }
            };
            if seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }

    tracing::debug!(
        patterns = patterns.len(),
        files = files.len(),
        "Resolved tx3 input patterns"
    );
    Ok(files)
}

/// Resolves user patterns (relative to `root` or absolute) into absolute file paths
pub fn resolve_input_files(
    patterns: &[String],
    root: &Path,
) -> Result<Vec<PathBuf>, GenerationError> {
    let absolute = patterns
        .iter()
        .map(|pattern| absolute_pattern(pattern, root))
        .collect::<Result<Vec<_>, _>>()?;
    expand_patterns(&absolute)
}

/// Decides whether a changed path belongs to the watched tx3 inputs
#[derive(Debug, Clone)]
pub struct InputMatcher {
    files: Vec<PathBuf>,
    directories: Vec<PathBuf>,
    patterns: Vec<Pattern>,
}

impl InputMatcher {
    /// Builds a matcher from absolute patterns and the files they resolved to
    pub fn new(absolute_patterns: &[String], files: &[PathBuf]) -> Result<Self, GenerationError> {
        let patterns = absolute_patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|e| GenerationError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let directories = files.iter().filter(|f| f.is_dir()).cloned().collect();

        Ok(Self {
            files: files.to_vec(),
            directories,
            patterns,
        })
    }

    /// True when `path` is a resolved input, lives under a resolved input
    /// directory, or matches one of the patterns (covers files created after
    /// resolution).
    pub fn matches(&self, path: &Path) -> bool {
        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::new()
        };

        self.files.iter().any(|f| f == path)
            || self.directories.iter().any(|d| path.starts_with(d))
            || self
                .patterns
                .iter()
                .any(|p| p.matches_path_with(path, options))
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, relative: &str) -> PathBuf {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "party Buyer;").unwrap();
        path
    }

    #[test]
    fn test_absolute_pattern_joins_relative_patterns() {
        let root = Path::new("/work/app");
        let pattern = absolute_pattern("./tx3/*.tx3", root).unwrap();
        assert_eq!(pattern, format!("/work/app{MAIN_SEPARATOR}tx3/*.tx3"));

        let untouched = absolute_pattern("/abs/main.tx3", root).unwrap();
        assert_eq!(untouched, "/abs/main.tx3");
    }

    #[test]
    fn test_absolute_pattern_escapes_root() {
        let root = Path::new("/work/[app]");
        let pattern = absolute_pattern("*.tx3", root).unwrap();
        assert!(pattern.starts_with("/work/[[]app[]]"));
    }

    #[test]
    fn test_resolve_mixes_literals_and_wildcards() {
        let temp = TempDir::new().unwrap();
        let a = touch(temp.path(), "tx3/a.tx3");
        let b = touch(temp.path(), "tx3/b.tx3");
        let main = touch(temp.path(), "main.tx3");
        touch(temp.path(), "tx3/notes.md");

        let files = resolve_input_files(
            &["main.tx3".to_string(), "tx3/*.tx3".to_string()],
            temp.path(),
        )
        .unwrap();

        assert_eq!(files, vec![main, a, b]);
        assert!(files.iter().all(|f| f.is_absolute()));
    }

    #[test]
    fn test_resolve_is_stable_and_deduplicated() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "tx3/z.tx3");
        touch(temp.path(), "tx3/m.tx3");
        touch(temp.path(), "tx3/a.tx3");

        let patterns = vec!["tx3/*.tx3".to_string(), "tx3/m.tx3".to_string()];
        let first = resolve_input_files(&patterns, temp.path()).unwrap();
        let second = resolve_input_files(&patterns, temp.path()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_pattern_without_matches_contributes_nothing() {
        let temp = TempDir::new().unwrap();
        let main = touch(temp.path(), "main.tx3");

        let files = resolve_input_files(
            &["missing/*.tx3".to_string(), "main.tx3".to_string()],
            temp.path(),
        )
        .unwrap();
        assert_eq!(files, vec![main]);

        let none = resolve_input_files(&["missing/*.tx3".to_string()], temp.path()).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let temp = TempDir::new().unwrap();
        let result = resolve_input_files(&["tx3/[.tx3".to_string()], temp.path());
        assert!(matches!(
            result,
            Err(GenerationError::InvalidPattern { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let main = touch(temp.path(), "tx3/main.tx3");
        let locked = temp.path().join("tx3/locked");
        touch(temp.path(), "tx3/locked/hidden.tx3");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let result = resolve_input_files(&["**/*.tx3".to_string()], temp.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        // root can still read the directory, so only the readable file is guaranteed
        let files = result.unwrap();
        assert!(files.contains(&main));
    }

    #[test]
    fn test_matcher_accepts_files_patterns_and_directories() {
        let temp = TempDir::new().unwrap();
        let a = touch(temp.path(), "tx3/a.tx3");
        let nested = touch(temp.path(), "protocols/nested/p.tx3");

        let patterns = vec![
            absolute_pattern("tx3/*.tx3", temp.path()).unwrap(),
            absolute_pattern("protocols", temp.path()).unwrap(),
        ];
        let files = expand_patterns(&patterns).unwrap();
        let matcher = InputMatcher::new(&patterns, &files).unwrap();

        assert!(matcher.matches(&a));
        assert!(matcher.matches(&nested));
        // created after resolution, still matched by the wildcard
        assert!(matcher.matches(&temp.path().join("tx3/new.tx3")));
        assert!(!matcher.matches(&temp.path().join("tx3/deep/x.tx3")));
        assert!(!matcher.matches(&temp.path().join("src/App.tsx")));
    }
}
