//! File content cache validated by content hash.
//!
//! Every lookup reads the file and hashes its bytes. The parsed value is reused
//! only while the hash matches the one recorded when it was parsed, so callers
//! always see the file's current content even if it is rewritten between
//! calls. Entries never expire on their own; they are replaced on change or
//! dropped through [`ContentCache::clear`].

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use md5::{Digest, Md5};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{MapGateError, Result};

/// How the bytes of a cached file are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataKind {
    /// Parsed as a JSON document.
    Json,
    /// Kept as UTF-8 text.
    Text,
}

impl DataKind {
    /// Picks the kind from a file extension: `.json` and `.geojson` are JSON,
    /// anything else is text.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") || ext.eq_ignore_ascii_case("geojson") => {
                Self::Json
            }
            _ => Self::Text,
        }
    }
}

/// Parsed file content, shared between the cache and its callers.
#[derive(Clone, Debug, PartialEq)]
pub enum CachedContent {
    Json(Arc<serde_json::Value>),
    Text(Arc<str>),
}

impl CachedContent {
    /// The kind this content was parsed as.
    pub fn kind(&self) -> DataKind {
        match self {
            Self::Json(_) => DataKind::Json,
            Self::Text(_) => DataKind::Text,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }

    /// Serializes the content for an HTTP body.
    pub fn to_bytes(&self) -> bytes::Bytes {
        match self {
            Self::Json(value) => bytes::Bytes::from(value.to_string()),
            Self::Text(text) => bytes::Bytes::copy_from_slice(text.as_bytes()),
        }
    }

    fn parse(raw: Vec<u8>, kind: DataKind) -> Result<Self> {
        match kind {
            DataKind::Json => serde_json::from_slice(&raw)
                .map(|value| Self::Json(Arc::new(value)))
                .map_err(|e| MapGateError::InvalidContent(e.to_string())),
            DataKind::Text => String::from_utf8(raw)
                .map(|text| Self::Text(Arc::from(text)))
                .map_err(|e| MapGateError::InvalidContent(e.to_string())),
        }
    }
}

/// One cached file: its parsed content and the hash of the bytes it came from.
#[derive(Debug)]
struct CacheEntry {
    content: CachedContent,
    content_hash: String,
}

/// Hex MD5 digest of `bytes`.
fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Md5::digest(bytes))
}

/// Path-keyed content cache.
///
/// Clones share the same entries.
///
/// # Example
///
/// ```
/// use mapgate_core::{ContentCache, DataKind};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let dir = std::env::temp_dir().join("mapgate-cache-doc");
/// std::fs::create_dir_all(&dir).unwrap();
/// let file = dir.join("a.json");
/// std::fs::write(&file, r#"{"x":1}"#).unwrap();
///
/// let cache = ContentCache::new();
/// let content = cache.get(&file, DataKind::Json).await.unwrap();
/// assert_eq!(content.as_json().unwrap()["x"], 1);
/// # });
/// ```
#[derive(Clone, Debug, Default)]
pub struct ContentCache {
    entries: Arc<Mutex<HashMap<PathBuf, CacheEntry>>>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the content of `path` interpreted as `kind`.
    ///
    /// The file is read and hashed on every call. The stored value is returned
    /// when the hash and kind match the entry; otherwise the bytes are parsed
    /// and the entry replaced. A parse failure leaves the previous entry as is.
    ///
    /// # Errors
    ///
    /// - [`MapGateError::NotFound`] if the file does not exist
    /// - [`MapGateError::InvalidContent`] if the bytes do not parse as `kind`
    /// - [`MapGateError::Io`] for any other read failure
    pub async fn get(&self, path: impl AsRef<Path>, kind: DataKind) -> Result<CachedContent> {
        let path = path.as_ref();
        let mut entries = self.entries.lock().await;

        let raw = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => MapGateError::NotFound(path.display().to_string()),
            _ => MapGateError::Io(e),
        })?;
        let hash = content_hash(&raw);

        if let Some(entry) = entries.get(path)
            && entry.content_hash == hash
            && entry.content.kind() == kind
        {
            debug!(path = %path.display(), "Cache hit");
            return Ok(entry.content.clone());
        }

        debug!(path = %path.display(), hash = %hash, "Cache miss, parsing file");
        let content = CachedContent::parse(raw, kind)?;
        entries.insert(
            path.to_path_buf(),
            CacheEntry {
                content: content.clone(),
                content_hash: hash,
            },
        );

        Ok(content)
    }

    /// Drops the entry for `path`, or every entry when `path` is `None`.
    ///
    /// Returns the number of entries removed.
    pub async fn clear(&self, path: Option<&Path>) -> usize {
        let mut entries = self.entries.lock().await;
        match path {
            Some(path) => usize::from(entries.remove(path).is_some()),
            None => {
                let removed = entries.len();
                entries.clear();
                removed
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Whether an entry for `path` is currently held.
    pub async fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.entries.lock().await.contains_key(path.as_ref())
    }
}
