//! Chapsplit Core Library
//!
//! Core functionality for splitting a single audio file into one track per
//! embedded chapter marker. Chapter boundaries are read with ffprobe and each
//! chapter is cut out of the original with a lossless ffmpeg stream copy.

pub mod error;
pub mod plan;
pub mod probe;
pub mod sanitize;
pub mod split;
pub mod tools;

// Re-export commonly used items at crate root
pub use error::{Result, SplitError};
pub use plan::{ExtractionJob, plan_jobs};
pub use probe::{AudioFile, Chapter, parse_chapter_report, probe_chapters};
pub use sanitize::sanitize_title;
pub use split::{MAX_CONCURRENT_EXTRACTIONS, run_jobs, split_by_chapters};
pub use tools::{Toolchain, get_root_cache_dir};
