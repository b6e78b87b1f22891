//! Watching a directory for browser-style downloads.
//!
//! A download in progress shows up as a `*.crdownload` file that is renamed
//! to its final name when the transfer ends.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::time::Instant;
use tracing::{debug, error};

use crate::error::{MediaError, MediaResult};

/// Suffix of partially downloaded files.
pub const PARTIAL_SUFFIX: &str = ".crdownload";

/// Timeouts and poll intervals for download watching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadWatch {
    pub start_timeout: Duration,
    pub start_poll: Duration,
    pub completion_timeout: Duration,
    pub completion_poll: Duration,
}

impl Default for DownloadWatch {
    fn default() -> Self {
        Self {
            start_timeout: Duration::from_secs(60),
            start_poll: Duration::from_millis(500),
            completion_timeout: Duration::from_secs(300),
            completion_poll: Duration::from_secs(1),
        }
    }
}

impl DownloadWatch {
    /// Wait for a download triggered after `baseline` was taken to start,
    /// then for every partial file to disappear.
    pub async fn wait(&self, dir: &Path, baseline: &HashSet<PathBuf>) -> MediaResult<()> {
        wait_for_download_start(dir, baseline, self.start_timeout, self.start_poll).await?;
        wait_for_download_completion(dir, self.completion_timeout, self.completion_poll).await
    }
}

/// Files currently present in `dir`. A missing directory is empty.
pub async fn snapshot_dir(dir: &Path) -> MediaResult<HashSet<PathBuf>> {
    let mut files = HashSet::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.insert(entry.path());
        }
    }
    Ok(files)
}

fn is_partial(path: &Path) -> bool {
    path.to_string_lossy().ends_with(PARTIAL_SUFFIX)
}

/// Wait until `dir` holds more files than `baseline` or a new partial file.
pub async fn wait_for_download_start(
    dir: &Path,
    baseline: &HashSet<PathBuf>,
    timeout: Duration,
    poll: Duration,
) -> MediaResult<()> {
    let deadline = Instant::now() + timeout;
    loop {
        let current = snapshot_dir(dir).await?;
        if current.len() > baseline.len()
            || current.difference(baseline).any(|p| is_partial(p))
        {
            debug!(dir = %dir.display(), "Download started");
            return Ok(());
        }
        if Instant::now() >= deadline {
            error!(dir = %dir.display(), "Download did not start within expected time");
            return Err(MediaError::DownloadTimeout {
                stage: "start",
                secs: timeout.as_secs(),
            });
        }
        tokio::time::sleep(poll).await;
    }
}

/// Wait until no partial file remains in `dir`.
pub async fn wait_for_download_completion(
    dir: &Path,
    timeout: Duration,
    poll: Duration,
) -> MediaResult<()> {
    let deadline = Instant::now() + timeout;
    loop {
        let current = snapshot_dir(dir).await?;
        if !current.iter().any(|p| is_partial(p)) {
            debug!(dir = %dir.display(), "Download complete");
            return Ok(());
        }
        if Instant::now() >= deadline {
            error!(dir = %dir.display(), "Download did not complete within expected time");
            return Err(MediaError::DownloadTimeout {
                stage: "complete",
                secs: timeout.as_secs(),
            });
        }
        tokio::time::sleep(poll).await;
    }
}

/// The file a download since `baseline` produced: the most recently
/// modified finished file absent from `baseline`.
///
/// Files already in `baseline` are never returned, however new their
/// modification time, since downloaders may copy an older one from the
/// server.
pub async fn downloaded_file(
    dir: &Path,
    baseline: &HashSet<PathBuf>,
) -> MediaResult<Option<PathBuf>> {
    let current = snapshot_dir(dir).await?;
    newest(current.difference(baseline).cloned().collect()).await
}

/// Most recently modified finished file among `files`.
async fn newest(files: HashSet<PathBuf>) -> MediaResult<Option<PathBuf>> {
    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for path in files {
        if is_partial(&path) {
            continue;
        }
        let modified = tokio::fs::metadata(&path).await?.modified()?;
        if latest.as_ref().map_or(true, |(t, _)| modified > *t) {
            latest = Some((modified, path));
        }
    }
    Ok(latest.map(|(_, path)| path))
}
