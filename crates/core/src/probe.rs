use std::path::Path;

use tokio::process::Command;
use tracing::debug;

use crate::{
    error::{Result, SplitError},
    sanitize::sanitize_title,
    tools::Toolchain,
};

/// One chapter marker as reported by ffprobe.
///
/// `start` and `end` are kept as the exact strings ffprobe printed and handed
/// to ffmpeg verbatim; the core never parses them into numbers. Ordering and
/// non-overlap are trusted from the report, not verified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    pub start: String,
    pub end: String,
}

/// The result of inspecting one input file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioFile {
    /// Chapters in report order; empty for single-chapter media.
    pub chapters: Vec<Chapter>,
    /// Extension of the original file including the leading dot (empty when
    /// the input has none), reused verbatim for the output files.
    pub format: String,
}

// Column layout of `ffprobe -print_format csv -show_chapters`:
//   chapter,<id>,<time_base>,<start>,<start_time>,<end>,<end_time>,<title>
// Positions are hard-coded; there is no header to look up. Brittle to
// upstream layout changes, and the unquoted mode means a title containing a
// comma is truncated at the first comma.
const START_TIME_FIELD: usize = 4;
const END_TIME_FIELD: usize = 6;
const TITLE_FIELD: usize = 7;

/// Parse the raw chapter report into an ordered chapter list.
///
/// Empty lines and lines with fewer than 4 comma-separated fields are
/// dropped; missing trailing fields read as empty strings. Titles are
/// sanitized for filesystem use before being stored.
pub fn parse_chapter_report(report: &str) -> Vec<Chapter> {
    let mut chapters = Vec::new();

    for line in report.lines() {
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 4 {
            continue;
        }

        let field = |i: usize| fields.get(i).copied().unwrap_or_default();

        chapters.push(Chapter {
            title: sanitize_title(field(TITLE_FIELD)),
            start: field(START_TIME_FIELD).to_string(),
            end: field(END_TIME_FIELD).to_string(),
        });
    }

    chapters
}

/// Inspect `input` with ffprobe and return its chapter list.
///
/// Zero chapters is a valid outcome, not an error. A spawn failure or a
/// non-zero ffprobe exit fails the whole run; there are no partial results.
pub async fn probe_chapters(tools: &Toolchain, input: &Path) -> Result<AudioFile> {
    let output = Command::new(&tools.ffprobe)
        .arg("-v")
        .arg("quiet")
        .arg("-print_format")
        .arg("csv")
        .arg("-show_chapters")
        .arg(input)
        .output()
        .await
        .map_err(|e| SplitError::ProbeFailed {
            input: input.to_path_buf(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(SplitError::ProbeFailed {
            input: input.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let report = String::from_utf8_lossy(&output.stdout);
    let chapters = parse_chapter_report(&report);
    debug!(chapters = chapters.len(), input = %input.display(), "probed chapters");

    let format = input
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();

    Ok(AudioFile { chapters, format })
}
