use crate::config::{LibraryRoots, TransferMode};
use crate::error::FileError;
use crate::media::MediaFile;
use crate::planner::Classification;
use crate::report::{Outcome, OutcomeRecord, RunReport};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Applies planned classifications to the filesystem, or only describes them
/// in a dry run.
///
/// Every change is all-or-nothing per file: the source is removed only after
/// a complete copy of it exists at the destination, and any failure leaves the
/// source where it was. An existing destination is never replaced.
pub struct Executor {
    roots: LibraryRoots,
    dry_run: bool,
    mode: TransferMode,
}

impl Executor {
    pub fn new(roots: LibraryRoots, dry_run: bool, mode: TransferMode) -> Self {
        Self {
            roots,
            dry_run,
            mode,
        }
    }

    /// Absolute path a classification points at.
    pub fn target(&self, classification: &Classification) -> PathBuf {
        match classification {
            Classification::Unique { destination } => self.roots.sorted.join(destination),
            Classification::Duplicate { destination, .. } => {
                self.roots.duplicates.join(destination)
            }
        }
    }

    /// Carry out one classification and append its outcome to the report.
    pub fn apply(
        &self,
        media: &MediaFile,
        classification: &Classification,
        report: &mut RunReport,
    ) -> Outcome {
        let target = self.target(classification);
        let duplicate_of = match classification {
            Classification::Duplicate { canonical, .. } => Some(canonical.clone()),
            Classification::Unique { .. } => None,
        };
        let timestamp_source = Some(media.captured().source);

        let (outcome, transfers) = match (classification, self.mode) {
            (Classification::Unique { .. }, TransferMode::Move) => (Outcome::Moved, true),
            (Classification::Unique { .. }, TransferMode::Copy) => (Outcome::Copied, true),
            (Classification::Duplicate { .. }, TransferMode::Move) => (Outcome::Duplicate, true),
            // Copy mode leaves the source tree alone, so duplicates stay put.
            (Classification::Duplicate { .. }, TransferMode::Copy) => (Outcome::Duplicate, false),
        };

        let result = if transfers {
            self.transfer(media.path(), &target)
        } else {
            Ok(())
        };

        let record = match result {
            Ok(()) => OutcomeRecord {
                path: media.path().to_path_buf(),
                outcome,
                destination: transfers.then(|| target),
                duplicate_of,
                timestamp_source,
                error_kind: None,
                error: None,
            },
            Err(err) => OutcomeRecord {
                destination: Some(target),
                duplicate_of,
                ..OutcomeRecord::failed(media.path().to_path_buf(), &err, timestamp_source)
            },
        };
        let outcome = record.outcome;
        report.record(record);
        outcome
    }

    fn transfer(&self, source: &Path, target: &Path) -> Result<(), FileError> {
        if target.symlink_metadata().is_ok() {
            return Err(FileError::CollisionFailure(target.to_path_buf()));
        }
        if self.dry_run {
            return Ok(());
        }

        let dir = target.parent().ok_or_else(|| {
            FileError::IoFailure(format!("{} has no parent directory", target.display()))
        })?;
        fs::create_dir_all(dir).map_err(|e| io_failure("creating destination directory", e))?;

        match self.mode {
            TransferMode::Move => move_file(source, target),
            TransferMode::Copy => copy_file(source, target),
        }
    }
}

fn io_failure(stage: &str, err: io::Error) -> FileError {
    FileError::IoFailure(format!("{}: {}", stage, err))
}

/// Link the destination first, then unlink the source. Where links are not
/// possible (another device, a filesystem without them) fall back to a staged
/// copy. The source disappears only once the destination is complete.
fn move_file(source: &Path, target: &Path) -> Result<(), FileError> {
    match fs::hard_link(source, target) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(FileError::CollisionFailure(target.to_path_buf()));
        }
        Err(e) => {
            debug!(
                "Cannot link {} -> {} ({}), copying instead",
                source.display(),
                target.display(),
                e
            );
            copy_file(source, target)?;
        }
    }

    if let Err(e) = fs::remove_file(source) {
        if let Err(undo) = fs::remove_file(target) {
            error!(
                "Failed to roll back {} after source removal failed: {}",
                target.display(),
                undo
            );
        }
        return Err(io_failure("removing source", e));
    }
    Ok(())
}

/// Copy into a temporary file beside the destination, sync it, then persist it
/// under the final name without replacing anything already there.
fn copy_file(source: &Path, target: &Path) -> Result<(), FileError> {
    let dir = target.parent().ok_or_else(|| {
        FileError::IoFailure(format!("{} has no parent directory", target.display()))
    })?;

    let mut input = File::open(source).map_err(|e| io_failure("opening source", e))?;
    let mut staged = tempfile::Builder::new()
        .prefix(".media-sorter-")
        .suffix(".partial")
        .tempfile_in(dir)
        .map_err(|e| io_failure("creating staging file", e))?;

    io::copy(&mut input, staged.as_file_mut()).map_err(|e| io_failure("copying content", e))?;
    if let Ok(modified) = input.metadata().and_then(|m| m.modified()) {
        staged
            .as_file()
            .set_modified(modified)
            .map_err(|e| io_failure("preserving modification time", e))?;
    }
    staged
        .as_file()
        .sync_all()
        .map_err(|e| io_failure("syncing staged copy", e))?;

    staged.persist_noclobber(target).map_err(|e| {
        if e.error.kind() == io::ErrorKind::AlreadyExists {
            FileError::CollisionFailure(target.to_path_buf())
        } else {
            io_failure("persisting staged copy", e.error)
        }
    })?;
    Ok(())
}
