use crate::config::{Layout, LibraryRoots};
use crate::index::DuplicateCheck;
use crate::media::MediaFile;
use ahash::AHashSet;
use chrono::Datelike;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Where a file is going. Destinations are relative: `Unique` to the sorted
/// root, `Duplicate` to the duplicates root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Unique {
        destination: PathBuf,
    },
    Duplicate {
        canonical: PathBuf,
        destination: PathBuf,
    },
}

impl Classification {
    pub fn destination(&self) -> &Path {
        match self {
            Classification::Unique { destination } => destination,
            Classification::Duplicate { destination, .. } => destination,
        }
    }
}

/// Answers "is something already at this absolute path?".
pub type OccupancyProbe = Box<dyn Fn(&Path) -> bool + Send + Sync>;

/// Decides target paths and keeps them unique for the whole run.
///
/// A destination counts as taken when it exists on disk or when an earlier
/// plan in this run already claimed it. The second rule is what keeps a
/// dry run, which never creates files, in agreement with a real run.
pub struct Planner {
    roots: LibraryRoots,
    layout: Layout,
    reserved: AHashSet<PathBuf>,
    occupied: OccupancyProbe,
}

impl Planner {
    pub fn new(roots: LibraryRoots, layout: Layout) -> Self {
        Self::with_probe(roots, layout, Box::new(|path: &Path| path.symlink_metadata().is_ok()))
    }

    pub fn with_probe(roots: LibraryRoots, layout: Layout, occupied: OccupancyProbe) -> Self {
        Self {
            roots,
            layout,
            reserved: AHashSet::new(),
            occupied,
        }
    }

    pub fn plan(&mut self, media: &MediaFile, check: DuplicateCheck) -> Classification {
        match check {
            DuplicateCheck::Unique => {
                let preferred = self.unique_path(media);
                let base = self.roots.sorted.clone();
                Classification::Unique {
                    destination: self.claim(&base, preferred),
                }
            }
            DuplicateCheck::Duplicate(canonical) => {
                let preferred = PathBuf::from(media.file_name());
                let base = self.roots.duplicates.clone();
                Classification::Duplicate {
                    canonical,
                    destination: self.claim(&base, preferred),
                }
            }
        }
    }

    fn unique_path(&self, media: &MediaFile) -> PathBuf {
        match self.layout {
            Layout::YearMonth => {
                let at = media.captured().at;
                PathBuf::from(format!("{:04}", at.year()))
                    .join(format!("{:02}", at.month()))
                    .join(media.file_name())
            }
            Layout::Mirror => media
                .path()
                .strip_prefix(&self.roots.source)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| PathBuf::from(media.file_name())),
        }
    }

    fn claim(&mut self, base: &Path, preferred: PathBuf) -> PathBuf {
        let mut candidate = preferred.clone();
        let mut counter = 0usize;
        loop {
            let absolute = base.join(&candidate);
            if !self.reserved.contains(&absolute) && !(self.occupied)(&absolute) {
                self.reserved.insert(absolute);
                return candidate;
            }
            counter += 1;
            candidate = with_suffix(&preferred, counter);
        }
    }
}

/// `2022/05/a.jpg` + 2 → `2022/05/a_2.jpg`
fn with_suffix(path: &Path, counter: usize) -> PathBuf {
    let mut name = path
        .file_stem()
        .map(OsStr::to_os_string)
        .unwrap_or_default();
    name.push(format!("_{}", counter));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}
