//! YAML configuration.
//!
//! ```yaml
//! policy:
//!   success: [200]
//!   negative: [404, 401]
//! snapshot: /var/cache/registry.json
//! fetch:
//!   timeout: 30s
//!   user_agent: flightbox/0.1
//! ```
//!
//! Every section is optional. An empty document gives the registry status
//! table, no snapshot and default fetch settings.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flightbox_core::{CacheKey, Disposition, StatusPolicy, StatusTable};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::MemoCache;
use crate::error::ConfigError;
use crate::snapshot::Snapshot;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Status codes the cache stores.
    pub policy: PolicyConfig,
    /// Snapshot to seed the cache from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
    /// Settings for the HTTP fetcher.
    pub fetch: FetchConfig,
}

/// Status codes the cache stores, by disposition.
///
/// Codes in neither list are never cached.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    /// Codes whose body is handed to callers.
    pub success: Vec<u16>,
    /// Codes remembered as a definitive "not available".
    pub negative: Vec<u16>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            success: vec![StatusCode::OK.as_u16()],
            negative: vec![
                StatusCode::NOT_FOUND.as_u16(),
                StatusCode::UNAUTHORIZED.as_u16(),
            ],
        }
    }
}

impl PolicyConfig {
    /// Builds the status table, rejecting invalid or contradictory codes.
    pub fn status_table(&self) -> Result<StatusTable, ConfigError> {
        let mut table = StatusTable::new();
        for (codes, disposition) in [
            (&self.success, Disposition::Success),
            (&self.negative, Disposition::Negative),
        ] {
            for &code in codes {
                let status = StatusCode::from_u16(code).map_err(|_| ConfigError::InvalidStatus(code))?;
                match table.disposition(status) {
                    Some(existing) if existing != disposition => {
                        return Err(ConfigError::ConflictingStatus(code));
                    }
                    _ => table = table.with(status, disposition),
                }
            }
        }
        Ok(table)
    }
}

/// HTTP fetch settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    /// Whole-request timeout (e.g. "30s", "500ms").
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    /// `User-Agent` header sent with every request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Config {
    /// Parses configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_saphyr::from_str(yaml)?)
    }

    /// Reads configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        debug!(path = %path.display(), "Loaded configuration");
        Self::from_yaml(&yaml)
    }

    /// Builds the classification policy.
    pub fn status_policy(&self) -> Result<StatusPolicy, ConfigError> {
        self.policy.status_table().map(StatusPolicy::new)
    }

    /// Builds a cache, seeding it from the configured snapshot if any.
    pub fn into_cache(&self) -> Result<MemoCache<CacheKey>, ConfigError> {
        let policy = self.status_policy()?;
        match &self.snapshot {
            Some(path) => Ok(MemoCache::with_snapshot(policy, Snapshot::load(path)?)),
            None => Ok(MemoCache::new(policy)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_empty_document_gives_registry_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(
            config.status_policy().unwrap().table(),
            &StatusTable::registry()
        );
    }

    #[test]
    fn test_full_document() {
        let yaml = r#"
policy:
  success: [200, 203]
  negative: [404]
snapshot: /var/cache/registry.json
fetch:
  timeout: 1m 30s
  user_agent: flightbox/0.1
"#;
        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(
            config,
            Config {
                policy: PolicyConfig {
                    success: vec![200, 203],
                    negative: vec![404],
                },
                snapshot: Some(PathBuf::from("/var/cache/registry.json")),
                fetch: FetchConfig {
                    timeout: Some(Duration::from_secs(90)),
                    user_agent: Some("flightbox/0.1".to_string()),
                },
            }
        );

        let table = config.policy.status_table().unwrap();
        assert_eq!(
            table.disposition(StatusCode::NON_AUTHORITATIVE_INFORMATION),
            Some(Disposition::Success)
        );
        assert_eq!(table.disposition(StatusCode::UNAUTHORIZED), None);
    }

    #[test]
    fn test_round_trip() {
        let config = Config::default();
        let yaml = serde_saphyr::to_string(&config).unwrap();
        assert_eq!(Config::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn test_invalid_status_rejected() {
        let config = Config::from_yaml("policy:\n  success: [42]\n").unwrap();
        let error = config.status_policy().unwrap_err();
        assert!(matches!(error, ConfigError::InvalidStatus(42)));
    }

    #[test]
    fn test_conflicting_status_rejected() {
        let config = Config::from_yaml("policy:\n  success: [200]\n  negative: [200]\n").unwrap();
        let error = config.status_policy().unwrap_err();
        assert!(matches!(error, ConfigError::ConflictingStatus(200)));
    }

    #[test]
    fn test_malformed_yaml() {
        let error = Config::from_yaml("policy: [").unwrap_err();
        assert!(matches!(error, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_load_and_build_cache() {
        let mut snapshot = tempfile::NamedTempFile::new().unwrap();
        let records = Snapshot::new(chrono::Utc::now())
            .entry(CacheKey::new("a"), 200, "cached")
            .entry(CacheKey::new("b"), 500, "error");
        snapshot
            .write_all(&serde_json::to_vec(&records).unwrap())
            .unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "snapshot: {}", snapshot.path().display()).unwrap();

        let cache = Config::load(file.path()).unwrap().into_cache().unwrap();
        assert_eq!(cache.preloaded_at(), Some(records.timestamp));
        assert!(cache.contains(&CacheKey::new("a")));
        assert!(!cache.contains(&CacheKey::new("b")));
    }
}
