pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod hasher;
pub mod index;
pub mod media;
pub mod metadata;
pub mod planner;
pub mod progress;
pub mod report;
pub mod scanner;

pub use config::{AppConfig, Layout, LibraryRoots, TransferMode};
pub use engine::SortEngine;
pub use error::{Error, FileError};
pub use progress::{ProgressReporter, SilentReporter};
pub use report::{Counters, Outcome, OutcomeRecord, RunReport};
