use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Result, SplitError};

const FFMPEG_RELEASE_BASE: &str = "https://github.com/BtbN/FFmpeg-Builds/releases/download/latest";

#[cfg(windows)]
const EXE_SUFFIX: &str = ".exe";
#[cfg(not(windows))]
const EXE_SUFFIX: &str = "";

fn release_archive() -> &'static str {
    if cfg!(windows) {
        "ffmpeg-master-latest-win64-gpl.zip"
    } else {
        "ffmpeg-master-latest-linux64-gpl.tar.gz"
    }
}

/// Root cache directory for downloaded tool builds.
pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("chapsplit")
}

/// Resolved locations of the two external executables.
///
/// The rest of the core only needs two invocable paths; whether they came
/// from the inherited search path or from a provisioned download is
/// irrelevant to it.
#[derive(Clone, Debug)]
pub struct Toolchain {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Toolchain {
    /// Bare program names, resolved through the inherited search path.
    pub fn from_path() -> Self {
        Self {
            ffmpeg: PathBuf::from(format!("ffmpeg{EXE_SUFFIX}")),
            ffprobe: PathBuf::from(format!("ffprobe{EXE_SUFFIX}")),
        }
    }

    /// Absolute locations under a provisioning directory.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            ffmpeg: dir.join(format!("ffmpeg{EXE_SUFFIX}")),
            ffprobe: dir.join(format!("ffprobe{EXE_SUFFIX}")),
        }
    }

    /// Check that both executables spawn and exit cleanly on `-version`.
    pub async fn verify(&self) -> Result<()> {
        for tool in [&self.ffmpeg, &self.ffprobe] {
            let output = Command::new(tool)
                .arg("-version")
                .output()
                .await
                .map_err(|e| SplitError::ToolchainFailed {
                    tool: tool.display().to_string(),
                    reason: e.to_string(),
                })?;

            if !output.status.success() {
                return Err(SplitError::ToolchainFailed {
                    tool: tool.display().to_string(),
                    reason: format!("exited with {}", output.status),
                });
            }
        }
        Ok(())
    }

    /// Use the search-path binaries when they work, otherwise download a
    /// static build into the cache directory.
    pub async fn resolve(cache_dir: &Path) -> Result<Self> {
        let from_path = Self::from_path();
        if from_path.verify().await.is_ok() {
            debug!("using ffmpeg/ffprobe from search path");
            return Ok(from_path);
        }
        provision(cache_dir).await
    }
}

/// Download and unpack a static ffmpeg build, returning the resulting
/// toolchain.
///
/// The archive is kept in the cache directory and the download is skipped
/// when it is already there. The unpacked binaries are verified with
/// `-version` before being handed out.
pub async fn provision(cache_dir: &Path) -> Result<Toolchain> {
    let tools_dir = cache_dir.join("bin");
    let tools = Toolchain::in_dir(&tools_dir);

    if tools.verify().await.is_ok() {
        debug!(dir = %tools_dir.display(), "reusing provisioned toolchain");
        return Ok(tools);
    }

    fs::create_dir_all(cache_dir)?;
    let archive_name = release_archive();
    let archive_path = cache_dir.join(archive_name);

    if !archive_path.exists() {
        let url = format!("{FFMPEG_RELEASE_BASE}/{archive_name}");
        info!(%url, "downloading ffmpeg build");
        let response = reqwest::get(&url).await?;
        if !response.status().is_success() {
            return Err(SplitError::DownloadFailed {
                url,
                reason: format!("HTTP {}", response.status()),
            });
        }
        let body = response.bytes().await?;
        fs::write(&archive_path, &body)?;
    }

    fs::create_dir_all(&tools_dir)?;
    if cfg!(windows) {
        unpack_zip(&archive_path, &tools_dir)?;
    } else {
        unpack_tar_gz(&archive_path, &tools_dir)?;
    }

    tools.verify().await?;
    Ok(tools)
}

fn wanted_tool(file_name: &str) -> bool {
    file_name == format!("ffmpeg{EXE_SUFFIX}") || file_name == format!("ffprobe{EXE_SUFFIX}")
}

fn unpack_tar_gz(archive_path: &Path, tools_dir: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !wanted_tool(name) {
            continue;
        }

        let dest = tools_dir.join(name);
        entry.unpack(&dest)?;
        make_executable(&dest)?;
    }

    Ok(())
}

fn unpack_zip(archive_path: &Path, tools_dir: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| SplitError::ToolchainFailed {
            tool: archive_path.display().to_string(),
            reason: e.to_string(),
        })?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| SplitError::ToolchainFailed {
                tool: archive_path.display().to_string(),
                reason: e.to_string(),
            })?;
        let Some(name) = Path::new(entry.name())
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
        else {
            continue;
        };
        if !wanted_tool(&name) {
            continue;
        }

        let mut dest = File::create(tools_dir.join(&name))?;
        std::io::copy(&mut entry, &mut dest)?;
    }

    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
