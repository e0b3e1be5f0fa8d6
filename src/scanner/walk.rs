use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use tracing::error;
use walkdir::WalkDir;

/// NAS thumbnail and cache folders come in any case (`@eaDir`, `Cache`, `TMP`).
const IGNORE_MATCH: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEntry {
    File(PathBuf),
    /// A directory or entry that could not be read. The walk carries on.
    Unreadable { path: PathBuf, message: String },
}

/// Deterministic recursive enumeration of regular files under a root.
///
/// Every directory's entries are sorted by file name, so the sequence is the
/// same on every platform and every run over an unchanged tree. Symlinks are
/// neither followed nor yielded. Excluded directories and paths matching an
/// ignore glob (relative to the root) are pruned with everything below them.
pub struct Walker {
    root: PathBuf,
    excluded: Vec<PathBuf>,
    ignore_patterns: Vec<Pattern>,
}

impl Walker {
    pub fn new(root: &Path, excluded: &[PathBuf], ignore_globs: &[String]) -> Self {
        let ignore_patterns = ignore_globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();

        Self {
            root: root.to_path_buf(),
            excluded: excluded.to_vec(),
            ignore_patterns,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a fresh pass over the tree. Directories are read lazily as the
    /// iterator advances; calling `iter` again restarts from the top.
    pub fn iter(&self) -> impl Iterator<Item = WalkEntry> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !self.is_pruned(entry.path()))
            .filter_map(move |result| match result {
                Ok(entry) if entry.file_type().is_file() => Some(WalkEntry::File(entry.into_path())),
                Ok(_) => None,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    Some(WalkEntry::Unreadable {
                        path,
                        message: err.to_string(),
                    })
                }
            })
    }

    fn is_pruned(&self, path: &Path) -> bool {
        if self.excluded.iter().any(|dir| path.starts_with(dir)) {
            return true;
        }
        match path.strip_prefix(&self.root) {
            Ok(relative) if !relative.as_os_str().is_empty() => self
                .ignore_patterns
                .iter()
                .any(|pattern| pattern.matches_path_with(relative, IGNORE_MATCH)),
            _ => false,
        }
    }
}
