//! Fingerprint to file cache, persisted as one JSON document.
//!
//! ```json
//! {
//!   "FootageLinks": { "ocean,surf": "/work/stock-footage/clip.mp4" },
//!   "SpeechLinks":  { "Hello there": "/work/speech/3f2a.wav" },
//!   "MusicLinks":   { "calm|slow|ambient": "/work/music/bed.mp3" }
//! }
//! ```
//!
//! The whole document is rewritten on every mutation. Entries whose file no
//! longer exists are removed on lookup.

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::fingerprint::Fingerprint;

/// Metric names.
pub mod names {
    pub const CACHE_LOOKUPS_TOTAL: &str = "sclip_cache_lookups_total";
    pub const CACHE_STORES_TOTAL: &str = "sclip_cache_stores_total";
}

/// Asset table selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Footage,
    Speech,
    Music,
}

impl CacheKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::Footage => "footage",
            CacheKind::Speech => "speech",
            CacheKind::Music => "music",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CacheDocument {
    #[serde(default)]
    footage_links: BTreeMap<String, PathBuf>,
    #[serde(default)]
    speech_links: BTreeMap<String, PathBuf>,
    #[serde(default)]
    music_links: BTreeMap<String, PathBuf>,
}

impl CacheDocument {
    fn table(&self, kind: CacheKind) -> &BTreeMap<String, PathBuf> {
        match kind {
            CacheKind::Footage => &self.footage_links,
            CacheKind::Speech => &self.speech_links,
            CacheKind::Music => &self.music_links,
        }
    }

    fn table_mut(&mut self, kind: CacheKind) -> &mut BTreeMap<String, PathBuf> {
        match kind {
            CacheKind::Footage => &mut self.footage_links,
            CacheKind::Speech => &mut self.speech_links,
            CacheKind::Music => &mut self.music_links,
        }
    }
}

/// Persisted asset cache.
///
/// Share it behind an `Arc`; the internal lock serializes each
/// read-modify-persist cycle.
#[derive(Debug)]
pub struct AssetCache {
    path: PathBuf,
    document: Mutex<CacheDocument>,
}

impl AssetCache {
    /// Load the document at `path`. A missing or empty file is an empty cache.
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let document = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => CacheDocument::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::corrupt(&path, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CacheDocument::default(),
            Err(e) => return Err(e.into()),
        };

        info!(
            path = %path.display(),
            footage = document.footage_links.len(),
            speech = document.speech_links.len(),
            music = document.music_links.len(),
            "Asset cache loaded"
        );

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached file for `fingerprint`, if it still exists on disk.
    ///
    /// A stale entry is removed and the document persisted before `None`
    /// is returned.
    pub async fn lookup(
        &self,
        kind: CacheKind,
        fingerprint: &Fingerprint,
    ) -> StorageResult<Option<PathBuf>> {
        let mut document = self.document.lock().await;

        let Some(path) = document.table(kind).get(fingerprint.as_str()).cloned() else {
            record_lookup(kind, "miss");
            return Ok(None);
        };

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!(kind = %kind, key = %fingerprint, path = %path.display(), "Cache hit");
            record_lookup(kind, "hit");
            return Ok(Some(path));
        }

        info!(
            kind = %kind,
            key = %fingerprint,
            path = %path.display(),
            "Evicting cache entry for missing file"
        );
        document.table_mut(kind).remove(fingerprint.as_str());
        self.persist(&document).await?;
        record_lookup(kind, "stale");
        Ok(None)
    }

    /// Record `path` for `fingerprint`, replacing any previous entry.
    pub async fn store(
        &self,
        kind: CacheKind,
        fingerprint: &Fingerprint,
        path: impl Into<PathBuf>,
    ) -> StorageResult<()> {
        let path = path.into();
        let mut document = self.document.lock().await;
        debug!(kind = %kind, key = %fingerprint, path = %path.display(), "Cache store");
        document
            .table_mut(kind)
            .insert(fingerprint.as_str().to_string(), path);
        self.persist(&document).await?;
        counter!(names::CACHE_STORES_TOTAL, "kind" => kind.as_str()).increment(1);
        Ok(())
    }

    /// Number of entries in the `kind` table.
    pub async fn len(&self, kind: CacheKind) -> usize {
        self.document.lock().await.table(kind).len()
    }

    pub async fn is_empty(&self) -> bool {
        let document = self.document.lock().await;
        document.footage_links.is_empty()
            && document.speech_links.is_empty()
            && document.music_links.is_empty()
    }

    async fn persist(&self, document: &CacheDocument) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(document)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn record_lookup(kind: CacheKind, result: &'static str) {
    counter!(
        names::CACHE_LOOKUPS_TOTAL,
        "kind" => kind.as_str(),
        "result" => result
    )
    .increment(1);
}
