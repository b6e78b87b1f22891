//! Moving downloaded assets between directories.

use std::path::Path;
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Move a finished download from `src` to `dst`.
///
/// Tries a rename first and falls back to copy-then-delete when the two
/// paths are on different filesystems. The copy goes through a temp file
/// next to `dst` so readers never see a partial file.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "Cross-device rename detected, falling back to copy+delete: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// EXDEV (18 on Linux and macOS).
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

/// Copy to a sibling temp file of `dst`, rename it, then drop `src`.
async fn copy_and_delete(src: &Path, dst: &Path) -> MediaResult<()> {
    let tmp_dst = dst.with_extension("partial");

    fs::copy(src, &tmp_dst).await.map_err(|e| {
        tracing::error!(
            "Failed to copy download across devices: {} -> {}: {}",
            src.display(),
            tmp_dst.display(),
            e
        );
        MediaError::from(e)
    })?;

    fs::rename(&tmp_dst, dst).await.map_err(|e| {
        let _ = std::fs::remove_file(&tmp_dst);
        tracing::error!(
            "Failed to publish copied download: {} -> {}: {}",
            tmp_dst.display(),
            dst.display(),
            e
        );
        MediaError::from(e)
    })?;

    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!(
            "Left source download behind after copy: {}: {}",
            src.display(),
            e
        );
    }

    tracing::debug!(
        "Moved download across devices: {} -> {}",
        src.display(),
        dst.display()
    );

    Ok(())
}

/// Remove `path` if present.
pub async fn remove_if_exists(path: impl AsRef<Path>) -> MediaResult<()> {
    match fs::remove_file(path.as_ref()).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Delete files in `dir` whose name contains any of `markers`.
///
/// Returns how many files were removed. A missing directory removes nothing.
pub async fn remove_temp_files(dir: impl AsRef<Path>, markers: &[&str]) -> MediaResult<usize> {
    let dir = dir.as_ref();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if markers.iter().any(|m| name.contains(m)) && entry.file_type().await?.is_file() {
            fs::remove_file(entry.path()).await?;
            removed += 1;
        }
    }
    Ok(removed)
}
