use crate::config::{AppConfig, LibraryRoots};
use crate::error::{Error, FileError};
use crate::executor::Executor;
use crate::hasher;
use crate::index::DuplicateIndex;
use crate::media::{self, MediaFile};
use crate::metadata;
use crate::planner::Planner;
use crate::progress::ProgressReporter;
use crate::report::{Outcome, OutcomeRecord, RunReport};
use crate::scanner::{WalkEntry, Walker};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Paths handed to the extraction stage at a time.
const BATCH_SIZE: usize = 256;

pub struct SortEngine {
    config: AppConfig,
}

impl SortEngine {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Run the full sort pipeline:
    /// 1. Resolve the roots (fatal problems stop the run before any file is touched)
    /// 2. Optionally fingerprint the existing library into the duplicate index
    /// 3. Walk the source, extract each batch (in parallel when `workers > 1`),
    ///    then check, plan and apply one file at a time in walk order
    pub fn run(&self, reporter: &dyn ProgressReporter) -> Result<RunReport, Error> {
        let roots = self.config.resolve_roots()?;
        info!(
            source = %roots.source.display(),
            sorted = %roots.sorted.display(),
            duplicates = %roots.duplicates.display(),
            dry_run = self.config.dry_run,
            mode = %self.config.mode,
            layout = %self.config.layout,
            "Starting sort"
        );

        let pool = build_pool(self.config.workers)?;
        let mut index = DuplicateIndex::new();
        if self.config.seed_from_library {
            self.seed_library(&roots, pool.as_ref(), &mut index, reporter);
        }

        let mut pipeline = Pipeline {
            index,
            planner: Planner::new(roots.clone(), self.config.layout),
            executor: Executor::new(roots.clone(), self.config.dry_run, self.config.mode),
            report: RunReport::new(self.config.dry_run),
            reporter,
            progress_interval: self.config.progress_interval,
            processed: 0,
            started: Instant::now(),
        };

        reporter.on_sort_start(self.config.dry_run);
        let walker = Walker::new(
            &roots.source,
            &[roots.sorted.clone(), roots.duplicates.clone()],
            &self.config.ignore_patterns,
        );

        let mut batch = Vec::with_capacity(BATCH_SIZE);
        for entry in walker.iter() {
            match entry {
                WalkEntry::File(path) => {
                    batch.push(path);
                    if batch.len() == BATCH_SIZE {
                        pipeline.process_batch(pool.as_ref(), &mut batch);
                    }
                }
                WalkEntry::Unreadable { path, message } => {
                    // Flush first so records stay in walk order.
                    pipeline.process_batch(pool.as_ref(), &mut batch);
                    pipeline.record_unreadable(path, message);
                }
            }
        }
        pipeline.process_batch(pool.as_ref(), &mut batch);

        let mut report = pipeline.report;
        report.finish();
        log_summary(&report);
        reporter.on_sort_complete(&report);
        Ok(report)
    }

    /// Register everything already in the sorted library, so re-imports of
    /// files that were sorted earlier are recognised as duplicates.
    fn seed_library(
        &self,
        roots: &LibraryRoots,
        pool: Option<&ThreadPool>,
        index: &mut DuplicateIndex,
        reporter: &dyn ProgressReporter,
    ) -> usize {
        if !roots.sorted.is_dir() {
            return 0;
        }
        reporter.on_library_index_start();
        let start = Instant::now();

        let walker = Walker::new(
            &roots.sorted,
            &[roots.duplicates.clone()],
            &self.config.ignore_patterns,
        );
        let mut batch = Vec::with_capacity(BATCH_SIZE);
        let mut indexed = 0;
        for entry in walker.iter() {
            match entry {
                WalkEntry::File(path) => {
                    if media::media_kind_for(&path).is_some() {
                        batch.push(path);
                    }
                    if batch.len() == BATCH_SIZE {
                        indexed += register_library_batch(pool, &mut batch, index);
                    }
                }
                WalkEntry::Unreadable { path, message } => {
                    warn!("Cannot read library entry {}: {}", path.display(), message);
                }
            }
        }
        indexed += register_library_batch(pool, &mut batch, index);

        let duration = start.elapsed().as_secs_f64();
        info!(
            "Indexed {} library files under {} ({} distinct) in {:.2}s",
            indexed,
            walker.root().display(),
            index.len(),
            duration
        );
        reporter.on_library_index_complete(indexed, duration);
        indexed
    }
}

/// Per-run state of the sequential stage.
struct Pipeline<'a> {
    index: DuplicateIndex,
    planner: Planner,
    executor: Executor,
    report: RunReport,
    reporter: &'a dyn ProgressReporter,
    progress_interval: usize,
    processed: usize,
    started: Instant,
}

impl Pipeline<'_> {
    fn process_batch(&mut self, pool: Option<&ThreadPool>, batch: &mut Vec<PathBuf>) {
        if batch.is_empty() {
            return;
        }
        let extracted = map_batch(pool, batch, metadata::extract);

        for (path, result) in batch.drain(..).zip(extracted) {
            let outcome = match result {
                Ok(media) => self.classify_and_apply(&media),
                Err(FileError::UnsupportedType) => {
                    self.report.record(OutcomeRecord::skipped(path.clone()));
                    Outcome::SkippedUnsupported
                }
                Err(err) => {
                    self.report
                        .record(OutcomeRecord::failed(path.clone(), &err, None));
                    Outcome::Failed
                }
            };
            self.after_file(&path, outcome);
        }
    }

    /// Index check, planning and execution. Never runs concurrently, so the
    /// first file seen with some content is always the canonical one.
    fn classify_and_apply(&mut self, media: &MediaFile) -> Outcome {
        let fingerprint = match media.fingerprint() {
            Ok(fp) => fp,
            Err(e) => {
                let err = FileError::ExtractionFailure(format!("hashing content: {}", e));
                self.report.record(OutcomeRecord::failed(
                    media.path().to_path_buf(),
                    &err,
                    Some(media.captured().source),
                ));
                return Outcome::Failed;
            }
        };
        let check = self.index.check_and_register(fingerprint, media.path());
        let classification = self.planner.plan(media, check);
        debug!(
            "{} ({:?}, {} bytes) [{}] -> {:?}",
            media.path().display(),
            media.kind(),
            media.size(),
            fingerprint,
            classification
        );
        self.executor.apply(media, &classification, &mut self.report)
    }

    fn record_unreadable(&mut self, path: PathBuf, message: String) {
        let err = FileError::IoFailure(message);
        self.report.record(OutcomeRecord::failed(path.clone(), &err, None));
        self.after_file(&path, Outcome::Failed);
    }

    fn after_file(&mut self, path: &Path, outcome: Outcome) {
        self.processed += 1;
        self.reporter.on_file_processed(self.processed, path, outcome);
        if self.progress_interval > 0 && self.processed % self.progress_interval == 0 {
            let elapsed = self.started.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                self.processed as f64 / elapsed
            } else {
                0.0
            };
            info!("{} scanned ({:.1} f/s)", self.processed, rate);
        }
    }
}

fn build_pool(workers: usize) -> Result<Option<ThreadPool>, Error> {
    if workers <= 1 {
        return Ok(None);
    }
    ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("extract-{}", i))
        .build()
        .map(Some)
        .map_err(|e| Error::Other(format!("Failed to start worker pool: {}", e)))
}

/// Apply `f` to every path, in parallel when a pool is given. Results keep the
/// order of `paths`.
fn map_batch<T, F>(pool: Option<&ThreadPool>, paths: &[PathBuf], f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&Path) -> T + Send + Sync,
{
    match pool {
        Some(pool) => pool.install(|| paths.par_iter().map(|p| f(p.as_path())).collect()),
        None => paths.iter().map(|p| f(p.as_path())).collect(),
    }
}

fn register_library_batch(
    pool: Option<&ThreadPool>,
    batch: &mut Vec<PathBuf>,
    index: &mut DuplicateIndex,
) -> usize {
    let fingerprints = map_batch(pool, batch, hasher::fingerprint_file);
    let mut indexed = 0;
    for (path, result) in batch.drain(..).zip(fingerprints) {
        match result {
            Ok(fp) => {
                index.check_and_register(fp, &path);
                indexed += 1;
            }
            Err(e) => warn!("Cannot fingerprint library file {}: {}", path.display(), e),
        }
    }
    indexed
}

fn log_summary(report: &RunReport) {
    let counters = report.counters();
    info!(
        scanned = counters.scanned,
        moved = counters.moved,
        copied = counters.copied,
        duplicate = counters.duplicate,
        skipped_unsupported = counters.skipped_unsupported,
        failed = counters.failed,
        dry_run = report.dry_run(),
        duration_secs = report.duration().as_secs_f64(),
        "Sort complete"
    );
    for failure in report.failures() {
        warn!(
            path = %failure.path.display(),
            reason = failure.error.as_deref().unwrap_or_default(),
            "Failed file"
        );
    }
}
