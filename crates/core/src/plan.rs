use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    error::{Result, SplitError},
    probe::AudioFile,
};

/// One planned extraction, derived 1:1 from a chapter and its position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionJob {
    /// Zero-based position in the chapter sequence. Keeps output names unique
    /// and order-stable even when titles collide or sanitize to nothing.
    pub index: usize,
    /// Sanitized chapter title, kept so a failed job can name its chapter.
    pub title: String,
    pub start: String,
    pub end: String,
    pub output_path: PathBuf,
}

/// Turn a probed file into the ordered job list and make sure `output_dir`
/// exists.
///
/// Output names are `{index}_{title}{format}`; the index is a plain decimal
/// with no zero padding, so lexical order only matches chapter order below
/// ten chapters. Directory creation is recursive and idempotent; failure is
/// fatal to the whole run.
pub fn plan_jobs(file: &AudioFile, output_dir: &Path) -> Result<Vec<ExtractionJob>> {
    fs::create_dir_all(output_dir).map_err(|e| SplitError::OutputDirFailed {
        dir: output_dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let jobs: Vec<ExtractionJob> = file
        .chapters
        .iter()
        .enumerate()
        .map(|(index, chapter)| ExtractionJob {
            index,
            title: chapter.title.clone(),
            start: chapter.start.clone(),
            end: chapter.end.clone(),
            output_path: output_dir.join(format!("{index}_{}{}", chapter.title, file.format)),
        })
        .collect();

    debug!(jobs = jobs.len(), dir = %output_dir.display(), "planned extraction jobs");
    Ok(jobs)
}
