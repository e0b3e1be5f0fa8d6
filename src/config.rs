use crate::error::Error;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// How unique files reach the sorted library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    Move,
    Copy,
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMode::Move => write!(f, "move"),
            TransferMode::Copy => write!(f, "copy"),
        }
    }
}

/// Folder structure used for unique files under the sorted root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    /// `<year>/<month>/<file name>` from the capture time.
    YearMonth,
    /// Same relative path as in the source tree.
    Mirror,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::YearMonth => write!(f, "year-month"),
            Layout::Mirror => write!(f, "mirror"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source_root: PathBuf,
    pub sorted_root: PathBuf,
    pub duplicates_root: PathBuf,
    pub dry_run: bool,
    pub mode: TransferMode,
    pub layout: Layout,
    pub ignore_patterns: Vec<String>,
    pub workers: usize,
    pub progress_interval: usize,
    pub seed_from_library: bool,
    pub report_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("./inbox"),
            sorted_root: PathBuf::from("./sorted"),
            duplicates_root: PathBuf::from("./duplicates"),
            dry_run: true,
            mode: TransferMode::Move,
            layout: Layout::YearMonth,
            ignore_patterns: ["**/@eaDir", "**/.@__thumb", "**/tmp", "**/cache"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            workers: 1,
            progress_interval: 10_000,
            seed_from_library: true,
            report_path: None,
        }
    }
}

/// Absolute, symlink-free locations of the three roots a run works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRoots {
    pub source: PathBuf,
    pub sorted: PathBuf,
    pub duplicates: PathBuf,
}

impl AppConfig {
    /// Validate and resolve the configured roots. Every failure here is fatal
    /// and happens before any file is touched.
    pub fn resolve_roots(&self) -> Result<LibraryRoots, Error> {
        let source = fs::canonicalize(&self.source_root).map_err(|err| {
            Error::FatalConfig(format!(
                "source root {} is not accessible: {}",
                self.source_root.display(),
                err
            ))
        })?;
        if !source.is_dir() {
            return Err(Error::FatalConfig(format!(
                "source root {} is not a directory",
                source.display()
            )));
        }
        fs::read_dir(&source).map_err(|err| {
            Error::FatalConfig(format!(
                "source root {} is not readable: {}",
                source.display(),
                err
            ))
        })?;

        let sorted = resolve_output(&self.sorted_root, "sorted")?;
        let duplicates = resolve_output(&self.duplicates_root, "duplicates")?;

        for (name, root) in [("sorted", &sorted), ("duplicates", &duplicates)] {
            if source.starts_with(root) {
                return Err(Error::FatalConfig(format!(
                    "source root {} lies inside the {} root {}",
                    source.display(),
                    name,
                    root.display()
                )));
            }
        }
        if sorted == duplicates {
            return Err(Error::FatalConfig(format!(
                "sorted and duplicates roots are both {}",
                sorted.display()
            )));
        }

        Ok(LibraryRoots {
            source,
            sorted,
            duplicates,
        })
    }
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("MEDIA_SORTER")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

fn resolve_output(path: &Path, name: &str) -> Result<PathBuf, Error> {
    resolve_path(path).map_err(|err| {
        Error::FatalConfig(format!(
            "{} root {} cannot be resolved: {}",
            name,
            path.display(),
            err
        ))
    })
}

/// Canonicalize a path that may not exist yet: the deepest existing ancestor
/// is canonicalized and the missing tail is appended unchanged.
pub fn resolve_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut existing = absolute.as_path();
    let mut missing: Vec<OsString> = Vec::new();
    loop {
        match fs::canonicalize(existing) {
            Ok(mut resolved) => {
                for name in missing.iter().rev() {
                    resolved.push(name);
                }
                return Ok(resolved);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        missing.push(name.to_os_string());
                        existing = parent;
                    }
                    _ => return Err(err),
                }
            }
            Err(err) => return Err(err),
        }
    }
}
