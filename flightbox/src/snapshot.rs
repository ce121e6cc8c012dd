//! Read-only snapshots of previously fetched results.
//!
//! A snapshot is a JSON document holding the time it was taken and one
//! record per key:
//!
//! ```json
//! {
//!   "timestamp": "2026-01-01T00:00:00Z",
//!   "entries": [
//!     { "key": "https://pypi.org/pypi/requests/json", "status": 200, "body": "{...}" },
//!     { "key": "https://pypi.org/pypi/no-such-pkg/json", "status": 404, "body": "" }
//!   ]
//! }
//! ```
//!
//! Bodies are stored as text. Snapshots are only ever read; seed a cache
//! from one with [`MemoCache::with_snapshot`](crate::MemoCache::with_snapshot).

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use flightbox_core::CacheKey;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Previously fetched results together with the time they were taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<K = CacheKey> {
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// Recorded results, at most one per key is loaded.
    #[serde(default = "Vec::new")]
    pub entries: Vec<SnapshotEntry<K>>,
}

/// One recorded fetch result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry<K = CacheKey> {
    /// Key the result was fetched for.
    pub key: K,
    /// Status code the registry answered with.
    pub status: u16,
    /// Response body.
    #[serde(default, with = "body_text")]
    pub body: Bytes,
}

impl<K> Snapshot<K> {
    /// Creates an empty snapshot taken at `timestamp`.
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            entries: Vec::new(),
        }
    }

    /// Adds a record.
    pub fn entry(mut self, key: K, status: u16, body: impl Into<Bytes>) -> Self {
        self.entries.push(SnapshotEntry {
            key,
            status,
            body: body.into(),
        });
        self
    }
}

impl<K> Snapshot<K>
where
    K: for<'de> Deserialize<'de>,
{
    /// Parses a snapshot from a JSON reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Reads a snapshot from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_reader(BufReader::new(file))
    }
}

mod body_text {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _, ser::Error as _};

    pub fn serialize<S: Serializer>(body: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        let text = std::str::from_utf8(body).map_err(S::Error::custom)?;
        serializer.serialize_str(text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        String::deserialize(deserializer)
            .map(Bytes::from)
            .map_err(D::Error::custom)
    }
}
