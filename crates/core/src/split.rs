use std::path::Path;
use std::sync::Arc;

use tokio::{process::Command, sync::Semaphore, task::JoinSet};
use tracing::{debug, info};

use crate::{
    error::{Result, SplitError},
    plan::{ExtractionJob, plan_jobs},
    probe::probe_chapters,
    tools::Toolchain,
};

/// Ceiling on simultaneously running ffmpeg processes per invocation.
pub const MAX_CONCURRENT_EXTRACTIONS: usize = 4;

/// Split `input` into one file per chapter under `output_dir`.
///
/// Probes the chapter list, plans the job list, then runs every extraction.
/// Zero chapters is a trivial success (the output directory is still
/// created). There is no timeout on the external processes; a hung ffmpeg
/// blocks the whole invocation.
pub async fn split_by_chapters(tools: &Toolchain, input: &Path, output_dir: &Path) -> Result<()> {
    let file = probe_chapters(tools, input).await?;
    let jobs = plan_jobs(&file, output_dir)?;
    run_jobs(tools, input, jobs).await
}

/// Run every job with at most [`MAX_CONCURRENT_EXTRACTIONS`] in flight.
///
/// All jobs run to completion even when a sibling fails; the first failure
/// collected is returned once the pool has drained. Which one that is when
/// several jobs fail concurrently is unspecified.
pub async fn run_jobs(tools: &Toolchain, input: &Path, jobs: Vec<ExtractionJob>) -> Result<()> {
    let gate = Arc::new(Semaphore::new(MAX_CONCURRENT_EXTRACTIONS));
    let mut tasks = JoinSet::new();

    for job in jobs {
        let gate = Arc::clone(&gate);
        let ffmpeg = tools.ffmpeg.clone();
        let input = input.to_path_buf();

        tasks.spawn(async move {
            let _permit = gate.acquire_owned().await.expect("extraction gate closed");
            extract_chapter(&ffmpeg, &input, &job).await
        });
    }

    let mut first_failure = None;
    while let Some(joined) = tasks.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => continue,
        };
        if let Err(e) = outcome {
            if first_failure.is_none() {
                first_failure = Some(e);
            }
        }
    }

    match first_failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Cut one chapter out of `input` with a lossless stream copy.
///
/// Exactly one ffmpeg invocation; no retry. Only the exit status is
/// inspected. An existing file at the destination is overwritten.
async fn extract_chapter(ffmpeg: &Path, input: &Path, job: &ExtractionJob) -> Result<()> {
    debug!(index = job.index, title = %job.title, "extracting chapter");

    let output = Command::new(ffmpeg)
        .arg("-y")
        .arg("-i")
        .arg(input)
        .arg("-ss")
        .arg(&job.start)
        .arg("-to")
        .arg(&job.end)
        .arg("-c")
        .arg("copy")
        .arg(&job.output_path)
        .output()
        .await
        .map_err(|e| SplitError::ChapterFailed {
            title: job.title.clone(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(SplitError::ChapterFailed {
            title: job.title.clone(),
            reason: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    info!(path = %job.output_path.display(), "chapter written");
    println!("Created: {}", job.output_path.display());
    Ok(())
}
