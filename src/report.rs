use crate::error::{Error, FileError};
use crate::media::TimestampSource;
use serde::{Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Moved,
    Copied,
    Duplicate,
    SkippedUnsupported,
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Outcome::Moved => "moved",
            Outcome::Copied => "copied",
            Outcome::Duplicate => "duplicate",
            Outcome::SkippedUnsupported => "skipped-unsupported",
            Outcome::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub scanned: usize,
    pub moved: usize,
    pub copied: usize,
    pub duplicate: usize,
    pub skipped_unsupported: usize,
    pub failed: usize,
}

impl fmt::Display for Counters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned={} moved={} copied={} duplicate={} skipped-unsupported={} failed={}",
            self.scanned,
            self.moved,
            self.copied,
            self.duplicate,
            self.skipped_unsupported,
            self.failed
        )
    }
}

/// What happened to one file. In a dry run this is what would have happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeRecord {
    #[serde(serialize_with = "lossy_path")]
    pub path: PathBuf,
    pub outcome: Outcome,
    #[serde(serialize_with = "lossy_optional_path")]
    pub destination: Option<PathBuf>,
    #[serde(serialize_with = "lossy_optional_path")]
    pub duplicate_of: Option<PathBuf>,
    pub timestamp_source: Option<TimestampSource>,
    pub error_kind: Option<&'static str>,
    pub error: Option<String>,
}

impl OutcomeRecord {
    pub fn skipped(path: PathBuf) -> Self {
        Self {
            path,
            outcome: Outcome::SkippedUnsupported,
            destination: None,
            duplicate_of: None,
            timestamp_source: None,
            error_kind: None,
            error: None,
        }
    }

    pub fn failed(path: PathBuf, err: &FileError, timestamp_source: Option<TimestampSource>) -> Self {
        Self {
            path,
            outcome: Outcome::Failed,
            destination: None,
            duplicate_of: None,
            timestamp_source,
            error_kind: Some(err.kind()),
            error: Some(err.to_string()),
        }
    }
}

// File names are not always valid UTF-8; the audit report must still hold them.
fn lossy_path<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}

fn lossy_optional_path<S: Serializer>(
    path: &Option<PathBuf>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match path {
        Some(path) => serializer.serialize_some(path.to_string_lossy().as_ref()),
        None => serializer.serialize_none(),
    }
}

/// Counters plus one record per walked file, in walk order.
///
/// Only the pipeline records into a report; callers get it back finished and
/// can only read it.
#[derive(Debug)]
pub struct RunReport {
    dry_run: bool,
    counters: Counters,
    records: Vec<OutcomeRecord>,
    started: Instant,
    duration: Duration,
}

impl RunReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            counters: Counters::default(),
            records: Vec::new(),
            started: Instant::now(),
            duration: Duration::ZERO,
        }
    }

    pub(crate) fn record(&mut self, record: OutcomeRecord) {
        log_record(&record, self.dry_run);
        self.counters.scanned += 1;
        match record.outcome {
            Outcome::Moved => self.counters.moved += 1,
            Outcome::Copied => self.counters.copied += 1,
            Outcome::Duplicate => self.counters.duplicate += 1,
            Outcome::SkippedUnsupported => self.counters.skipped_unsupported += 1,
            Outcome::Failed => self.counters.failed += 1,
        }
        self.records.push(record);
    }

    pub(crate) fn finish(&mut self) {
        self.duration = self.started.elapsed();
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn records(&self) -> &[OutcomeRecord] {
        &self.records
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn failures(&self) -> impl Iterator<Item = &OutcomeRecord> {
        self.records
            .iter()
            .filter(|record| record.outcome == Outcome::Failed)
    }

    /// Write every record as one CSV row, creating the parent directory.
    pub fn write_csv(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// One structured event per processed file.
fn log_record(record: &OutcomeRecord, dry_run: bool) {
    let display = |p: &Option<PathBuf>| {
        p.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    };
    let destination = display(&record.destination);
    let duplicate_of = display(&record.duplicate_of);
    let timestamp_source = record
        .timestamp_source
        .map(|s| s.to_string())
        .unwrap_or_default();

    match record.outcome {
        Outcome::Failed => warn!(
            path = %record.path.display(),
            outcome = %record.outcome,
            destination = %destination,
            error = record.error.as_deref().unwrap_or_default(),
            dry_run,
            "file failed"
        ),
        Outcome::SkippedUnsupported => info!(
            path = %record.path.display(),
            outcome = %record.outcome,
            "skipped"
        ),
        _ => info!(
            path = %record.path.display(),
            outcome = %record.outcome,
            destination = %destination,
            duplicate_of = %duplicate_of,
            timestamp_source = %timestamp_source,
            dry_run,
            "{}",
            if dry_run { "planned" } else { "applied" }
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn moved(path: &str, dest: &str) -> OutcomeRecord {
        OutcomeRecord {
            path: PathBuf::from(path),
            outcome: Outcome::Moved,
            destination: Some(PathBuf::from(dest)),
            duplicate_of: None,
            timestamp_source: Some(TimestampSource::Metadata),
            error_kind: None,
            error: None,
        }
    }

    #[test]
    fn test_counters_follow_records() {
        let mut report = RunReport::new(true);
        report.record(moved("/in/a.jpg", "/out/2022/05/a.jpg"));
        report.record(OutcomeRecord::skipped(PathBuf::from("/in/notes.txt")));
        report.record(OutcomeRecord::failed(
            PathBuf::from("/in/empty.jpg"),
            &FileError::ExtractionFailure("empty file".to_string()),
            None,
        ));
        report.finish();

        let counters = report.counters();
        assert_eq!(counters.scanned, 3);
        assert_eq!(counters.moved, 1);
        assert_eq!(counters.skipped_unsupported, 1);
        assert_eq!(counters.failed, 1);
        assert!(report.dry_run());
        assert_eq!(
            counters.to_string(),
            "scanned=3 moved=1 copied=0 duplicate=0 skipped-unsupported=1 failed=1"
        );
    }

    #[test]
    fn test_failures_carry_reasons() {
        let mut report = RunReport::new(false);
        report.record(moved("/in/a.jpg", "/out/a.jpg"));
        report.record(OutcomeRecord::failed(
            PathBuf::from("/in/b.jpg"),
            &FileError::IoFailure("permission denied".to_string()),
            Some(TimestampSource::FilesystemFallback),
        ));

        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].error_kind, Some("io-failure"));
        assert_eq!(
            failures[0].error.as_deref(),
            Some("io failure: permission denied")
        );
    }

    #[test]
    fn test_write_csv() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("logs").join("report.csv");
        let mut report = RunReport::new(false);
        report.record(moved("/in/a.jpg", "/out/2022/05/a.jpg"));
        report.record(OutcomeRecord::skipped(PathBuf::from("/in/notes.txt")));
        report.write_csv(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("path,outcome,destination,duplicate_of,timestamp_source,error_kind,error")
        );
        assert_eq!(
            lines.next(),
            Some("/in/a.jpg,moved,/out/2022/05/a.jpg,,metadata,,")
        );
        assert_eq!(lines.next(), Some("/in/notes.txt,skipped-unsupported,,,,,"));
        assert_eq!(lines.next(), None);
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_every_outcome_is_logged_at_info() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut report = RunReport::new(true);
            report.record(moved("/in/a.jpg", "/out/2022/05/a.jpg"));
            report.record(OutcomeRecord::skipped(PathBuf::from("/in/notes.txt")));
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("/in/a.jpg"));
        assert!(output.contains("/in/notes.txt"));
        assert!(output.contains("skipped-unsupported"));
    }

    #[cfg(unix)]
    #[test]
    fn test_write_csv_keeps_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = tempdir().unwrap();
        let path = tmp.path().join("report.csv");
        let latin1 = PathBuf::from("/in").join(OsStr::from_bytes(b"caf\xe9.jpg"));
        let mut report = RunReport::new(true);
        report.record(moved("/in/ok.jpg", "/out/2022/05/ok.jpg"));
        report.record(OutcomeRecord {
            destination: Some(PathBuf::from("/out/2022/05").join(latin1.file_name().unwrap())),
            duplicate_of: Some(latin1.clone()),
            outcome: Outcome::Duplicate,
            ..moved("/in/x.jpg", "")
        });
        report.record(OutcomeRecord::skipped(latin1));
        report.write_csv(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[2],
            "/in/x.jpg,duplicate,/out/2022/05/caf\u{FFFD}.jpg,/in/caf\u{FFFD}.jpg,metadata,,"
        );
        assert_eq!(lines[3], "/in/caf\u{FFFD}.jpg,skipped-unsupported,,,,,");
    }
}
