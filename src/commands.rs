use clap::{Args, Parser, Subcommand};
use media_sorter::{AppConfig, Layout, TransferMode};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "media-sorter")]
#[command(about = "Deduplicate a photo/video tree and sort it by capture date", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Deduplicate and sort the source tree (dry run unless --apply is given)
    Sort(SortArgs),
    /// Print configuration values
    PrintConfig,
    /// List the file extensions treated as photos and videos
    SupportedTypes,
}

#[derive(Debug, Args)]
pub struct SortArgs {
    /// Move or copy files for real instead of previewing the plan
    #[arg(long, conflicts_with = "dry_run")]
    pub apply: bool,
    /// Preview the plan without touching any file
    #[arg(long)]
    pub dry_run: bool,
    /// Copy unique files into the library and leave the source tree alone
    #[arg(long)]
    pub copy: bool,
    /// Keep the source folder structure instead of <year>/<month>
    #[arg(long)]
    pub mirror: bool,
    /// Source tree to sort
    #[arg(long)]
    pub source: Option<PathBuf>,
    /// Root of the sorted library
    #[arg(long)]
    pub sorted: Option<PathBuf>,
    /// Where duplicates are moved
    #[arg(long)]
    pub duplicates: Option<PathBuf>,
    /// Threads used for hashing and metadata extraction
    #[arg(long)]
    pub workers: Option<usize>,
    /// Write a CSV audit report of every file to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Do not index the existing sorted library before sorting
    #[arg(long)]
    pub no_library_seed: bool,
}

impl SortArgs {
    /// Command line flags win over file and environment configuration.
    pub fn apply_to(self, config: &mut AppConfig) {
        if self.apply {
            config.dry_run = false;
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.copy {
            config.mode = TransferMode::Copy;
        }
        if self.mirror {
            config.layout = Layout::Mirror;
        }
        if self.no_library_seed {
            config.seed_from_library = false;
        }
        if let Some(source) = self.source {
            config.source_root = source;
        }
        if let Some(sorted) = self.sorted {
            config.sorted_root = sorted;
        }
        if let Some(duplicates) = self.duplicates {
            config.duplicates_root = duplicates;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(report) = self.report {
            config.report_path = Some(report);
        }
    }
}
