use indicatif::{ProgressBar, ProgressStyle};
use media_sorter::{Outcome, ProgressReporter, RunReport};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// CLI progress reporter using indicatif spinners.
///
/// - Library index phase: spinner
/// - Sort phase: spinner with a running file count (the walk is lazy, so
///   there is no total up front)
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn spinner(message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_library_index_start(&self) {
        self.set_bar(Self::spinner("Indexing sorted library..."));
    }

    fn on_library_index_complete(&self, files_indexed: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Library indexed: {} files in {:.2}s",
            files_indexed, duration_secs
        );
    }

    fn on_sort_start(&self, dry_run: bool) {
        let message = if dry_run {
            "Planning (dry run)..."
        } else {
            "Sorting..."
        };
        self.set_bar(Self::spinner(message));
    }

    fn on_file_processed(&self, files_processed: usize, path: &Path, outcome: Outcome) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_message(format!(
                    "{} files ({}: {})",
                    files_processed,
                    outcome,
                    path.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default()
                ));
            }
        }
    }

    fn on_sort_complete(&self, report: &RunReport) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m {} complete: {} files in {:.2}s",
            if report.dry_run() { "Dry run" } else { "Sort" },
            report.counters().scanned,
            report.duration().as_secs_f64()
        );
    }
}
