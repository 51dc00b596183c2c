//! Finding the source files to search.
use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::{model::ExtractorConfig, Error};

/// The files under a search root, and the entries that could not be read
/// while walking it.
#[derive(Debug, Default)]
pub struct SourceFiles {
    /// Sorted by path.
    pub files: Vec<PathBuf>,
    pub unreadable: Vec<(PathBuf, Error)>,
}

pub struct FileSearcher;

impl FileSearcher {
    /// Find the files to search. That is the root itself in single file mode,
    /// otherwise every file below the root that matches the file pattern.
    /// Symlinks to files are searched, symlinked directories are not entered.
    pub fn find(config: &ExtractorConfig) -> SourceFiles {
        if config.is_single_file() {
            return SourceFiles {
                files: vec![config.root().to_path_buf()],
                unreadable: vec![],
            };
        }

        let root = config.root();
        let pattern = config.file_pattern();
        let mut found = SourceFiles::default();
        for entry in WalkDir::new(root) {
            match entry {
                Ok(entry) => {
                    if entry.path().is_file() && is_match(pattern, root, entry.path()) {
                        found.files.push(entry.into_path());
                    }
                }
                Err(source) => {
                    let path = source.path().unwrap_or(root).to_path_buf();
                    log::warn!("could not read {}: {source}", path.display());
                    found.unreadable.push((path, Error::Walk { source }));
                }
            }
        }
        found.files.sort();
        found
    }
}

/// Patterns without a `/` match the file name at any depth, patterns with one
/// match the path relative to the root.
fn is_match(pattern: &Pattern, root: &Path, path: &Path) -> bool {
    if pattern.as_str().contains('/') {
        path.strip_prefix(root)
            .is_ok_and(|relative| pattern.matches_path(relative))
    } else {
        path.file_name()
            .is_some_and(|name| pattern.matches(&name.to_string_lossy()))
    }
}
