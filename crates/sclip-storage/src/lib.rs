//! Persisted asset cache.
//!
//! This crate provides:
//! - Fingerprint derivation for footage keywords, narration text and soundtrack prompts
//! - A JSON-backed fingerprint to file table per asset kind
//! - Eviction of entries whose file has disappeared

pub mod asset_cache;
pub mod error;
pub mod fingerprint;

pub use asset_cache::{AssetCache, CacheKind};
pub use error::{StorageError, StorageResult};
pub use fingerprint::Fingerprint;
