//! End-to-end tests for the probe -> plan -> extract path.
//!
//! Real ffmpeg/ffprobe builds are too heavy to ship as test assets, so the
//! external tools are stood in for by tiny `/bin/sh` scripts generated at
//! runtime: the fake ffprobe prints a canned chapter report and the fake
//! ffmpeg touches (or refuses to touch) its output argument. This exercises
//! the whole pipeline, including the bounded executor, without any media.

#![cfg(unix)]

use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use chapsplit_core::{SplitError, Toolchain, split_by_chapters};
use tempfile::tempdir;

fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    writeln!(file, "#!/bin/sh\n{body}").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A fake ffprobe that prints `report` regardless of its arguments.
fn stub_ffprobe(dir: &Path, report: &str) {
    write_stub(dir, "ffprobe", &format!("cat <<'EOF'\n{report}EOF"));
}

/// A fake ffmpeg that creates its final argument, except for outputs whose
/// file name matches `fail_glob`, which make it exit non-zero instead.
fn stub_ffmpeg(dir: &Path, fail_glob: Option<&str>) {
    let body = match fail_glob {
        Some(glob) => format!(
            "for arg in \"$@\"; do out=\"$arg\"; done\n\
             case \"$(basename \"$out\")\" in\n  {glob}) exit 1 ;;\nesac\n\
             : > \"$out\""
        ),
        None => "for arg in \"$@\"; do out=\"$arg\"; done\n: > \"$out\"".to_string(),
    };
    write_stub(dir, "ffmpeg", &body);
}

fn chapter_line(index: usize, start: &str, end: &str, title: &str) -> String {
    format!("chapter,{index},1/1000000000,0,{start},0,{end},{title}\n")
}

fn output_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn splits_every_chapter_into_its_own_file() {
    let stub_dir = tempdir().unwrap();
    let work_dir = tempdir().unwrap();
    let input = work_dir.path().join("book.m4b");
    File::create(&input).unwrap();

    let report = chapter_line(0, "0.000000", "10.000000", "Intro")
        + &chapter_line(1, "10.000000", "50.000000", "Main");
    stub_ffprobe(stub_dir.path(), &report);
    stub_ffmpeg(stub_dir.path(), None);

    let tools = Toolchain::in_dir(stub_dir.path());
    let out = work_dir.path().join("chapters");
    split_by_chapters(&tools, &input, &out).await.unwrap();

    assert_eq!(output_names(&out), vec!["0_Intro.m4b", "1_Main.m4b"]);
}

#[tokio::test]
async fn one_failing_job_does_not_stop_its_siblings() {
    let stub_dir = tempdir().unwrap();
    let work_dir = tempdir().unwrap();
    let input = work_dir.path().join("book.mp3");
    File::create(&input).unwrap();

    let report: String = (0..10)
        .map(|i| chapter_line(i, &format!("{i}.0"), &format!("{}.0", i + 1), &format!("Part {i}")))
        .collect();
    stub_ffprobe(stub_dir.path(), &report);
    // Only the job for chapter 3 fails.
    stub_ffmpeg(stub_dir.path(), Some("3_*"));

    let tools = Toolchain::in_dir(stub_dir.path());
    let out = work_dir.path().join("chapters");
    let err = split_by_chapters(&tools, &input, &out).await.unwrap_err();

    match err {
        SplitError::ChapterFailed { title, .. } => assert_eq!(title, "Part 3"),
        other => panic!("expected ChapterFailed, got {other}"),
    }

    // The remaining nine chapters were all written.
    let names = output_names(&out);
    assert_eq!(names.len(), 9);
    assert!(!names.contains(&"3_Part 3.mp3".to_string()));
    assert!(names.contains(&"9_Part 9.mp3".to_string()));
}

#[tokio::test]
async fn several_failures_surface_one_of_them() {
    let stub_dir = tempdir().unwrap();
    let work_dir = tempdir().unwrap();
    let input = work_dir.path().join("book.mp3");
    File::create(&input).unwrap();

    let report: String = (0..6)
        .map(|i| chapter_line(i, "0.0", "1.0", &format!("Part {i}")))
        .collect();
    stub_ffprobe(stub_dir.path(), &report);
    stub_ffmpeg(stub_dir.path(), Some("1_*|4_*"));

    let tools = Toolchain::in_dir(stub_dir.path());
    let out = work_dir.path().join("chapters");
    let err = split_by_chapters(&tools, &input, &out).await.unwrap_err();

    // Which of the concurrent failures wins is unspecified; one of them must.
    match err {
        SplitError::ChapterFailed { title, .. } => {
            assert!(title == "Part 1" || title == "Part 4", "got {title}");
        }
        other => panic!("expected ChapterFailed, got {other}"),
    }
    assert_eq!(output_names(&out).len(), 4);
}

#[tokio::test]
async fn zero_chapters_is_a_trivial_success() {
    let stub_dir = tempdir().unwrap();
    let work_dir = tempdir().unwrap();
    let input = work_dir.path().join("single.mp3");
    File::create(&input).unwrap();

    stub_ffprobe(stub_dir.path(), "");
    stub_ffmpeg(stub_dir.path(), None);

    let tools = Toolchain::in_dir(stub_dir.path());
    let out = work_dir.path().join("chapters");
    split_by_chapters(&tools, &input, &out).await.unwrap();

    assert!(out.is_dir());
    assert!(output_names(&out).is_empty());
}

#[tokio::test]
async fn probe_failure_aborts_before_any_extraction() {
    let stub_dir = tempdir().unwrap();
    let work_dir = tempdir().unwrap();
    let input = work_dir.path().join("broken.mp3");
    File::create(&input).unwrap();

    write_stub(
        stub_dir.path(),
        "ffprobe",
        "echo 'moov atom not found' >&2\nexit 1",
    );
    stub_ffmpeg(stub_dir.path(), None);

    let tools = Toolchain::in_dir(stub_dir.path());
    let out = work_dir.path().join("chapters");
    let err = split_by_chapters(&tools, &input, &out).await.unwrap_err();

    match err {
        SplitError::ProbeFailed { reason, .. } => assert!(reason.contains("moov atom")),
        other => panic!("expected ProbeFailed, got {other}"),
    }
    // Planning never ran, so the output directory was never created.
    assert!(!out.exists());
}

#[tokio::test]
async fn colliding_sanitized_titles_produce_distinct_files() {
    let stub_dir = tempdir().unwrap();
    let work_dir = tempdir().unwrap();
    let input = work_dir.path().join("book.ogg");
    File::create(&input).unwrap();

    // Both titles sanitize to "Same".
    let report = chapter_line(0, "0.0", "1.0", "Same_") + &chapter_line(1, "1.0", "2.0", "Same");
    stub_ffprobe(stub_dir.path(), &report);
    stub_ffmpeg(stub_dir.path(), None);

    let tools = Toolchain::in_dir(stub_dir.path());
    let out = work_dir.path().join("chapters");
    split_by_chapters(&tools, &input, &out).await.unwrap();

    assert_eq!(output_names(&out), vec!["0_Same.ogg", "1_Same.ogg"]);
}

#[tokio::test]
async fn timestamps_reach_ffmpeg_verbatim() {
    let stub_dir = tempdir().unwrap();
    let work_dir = tempdir().unwrap();
    let input = work_dir.path().join("book.mp3");
    File::create(&input).unwrap();
    let log = work_dir.path().join("args.log");

    stub_ffprobe(
        stub_dir.path(),
        &chapter_line(0, "12.340000", "56.780000", "Only"),
    );
    write_stub(
        stub_dir.path(),
        "ffmpeg",
        &format!(
            "echo \"$@\" >> {}\nfor arg in \"$@\"; do out=\"$arg\"; done\n: > \"$out\"",
            log.display()
        ),
    );

    let tools = Toolchain::in_dir(stub_dir.path());
    let out = work_dir.path().join("chapters");
    split_by_chapters(&tools, &input, &out).await.unwrap();

    let recorded = fs::read_to_string(&log).unwrap();
    assert!(recorded.contains("-ss 12.340000 -to 56.780000 -c copy"));
    assert!(recorded.contains("-y -i"));
}
