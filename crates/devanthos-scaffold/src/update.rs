//! Periodic check for a newer published release.

use std::cmp::Ordering;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use devanthos_core::config::UpdateConfig;
use devanthos_core::error::AppError;
use devanthos_core::result::AppResult;

/// Outcome of a completed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateStatus {
    /// Running version.
    pub current: String,
    /// Latest published version.
    pub latest: String,
    /// Whether `latest` is newer than `current`.
    pub update_available: bool,
}

/// Record of the last check.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UpdateCache {
    /// Milliseconds since the epoch.
    timestamp: i64,
    version: String,
    checked: String,
}

#[derive(Debug, Deserialize)]
struct LatestRelease {
    version: Option<String>,
}

/// Queries the package registry at most once per configured interval.
#[derive(Debug, Clone)]
pub struct UpdateChecker {
    config: UpdateConfig,
    current_version: String,
    client: reqwest::Client,
}

impl UpdateChecker {
    /// Creates a checker for the running `current_version`.
    pub fn new(config: UpdateConfig, current_version: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.package.clone())
            .build()
            .map_err(|e| AppError::network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            current_version: current_version.into(),
            client,
        })
    }

    /// Cache file location, if one can be resolved.
    pub fn cache_path(&self) -> Option<PathBuf> {
        self.config.cache_path()
    }

    /// Whether the interval since the last recorded check has elapsed.
    ///
    /// A missing or unreadable cache counts as elapsed.
    pub async fn should_check(&self) -> bool {
        let Some(path) = self.cache_path() else {
            return true;
        };
        let Ok(raw) = tokio::fs::read_to_string(&path).await else {
            return true;
        };
        let Ok(cache) = serde_json::from_str::<UpdateCache>(&raw) else {
            return true;
        };

        let interval_ms = (self.config.check_interval_hours as i64).saturating_mul(3_600_000);
        Utc::now().timestamp_millis() - cache.timestamp > interval_ms
    }

    /// Runs the check. Returns `None` when skipped because of the interval.
    pub async fn check(&self, force: bool) -> AppResult<Option<UpdateStatus>> {
        if !force && !self.should_check().await {
            debug!("Update check skipped, checked recently");
            return Ok(None);
        }

        let latest = self.latest_version().await?;
        self.record(&latest).await;

        let update_available =
            compare_versions(&self.current_version, &latest) == Ordering::Less;
        Ok(Some(UpdateStatus {
            current: self.current_version.clone(),
            latest,
            update_available,
        }))
    }

    /// Fetches the latest published version.
    pub async fn latest_version(&self) -> AppResult<String> {
        let url = format!(
            "{}/{}/latest",
            self.config.registry_url.trim_end_matches('/'),
            self.config.package
        );
        let release: LatestRelease = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::network(format!("Failed to query {url}: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::network(format!("Invalid registry response: {e}")))?;

        release
            .version
            .ok_or_else(|| AppError::network("Registry response has no version"))
    }

    /// Deletes the cache file. Returns whether one existed.
    pub async fn clear_cache(&self) -> AppResult<bool> {
        let Some(path) = self.cache_path() else {
            return Ok(false);
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn record(&self, version: &str) {
        let Some(path) = self.cache_path() else {
            return;
        };
        let now = Utc::now();
        let cache = UpdateCache {
            timestamp: now.timestamp_millis(),
            version: version.to_string(),
            checked: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        let write = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let body = serde_json::to_vec_pretty(&cache)?;
            tokio::fs::write(&path, body).await?;
            Ok::<_, AppError>(())
        };
        if let Err(e) = write.await {
            debug!(path = %path.display(), error = %e, "Could not write update cache");
        }
    }
}

/// Orders two version strings.
///
/// Full semver is compared exactly. Anything else is compared on its first
/// three numeric dot-separated parts, missing or non-numeric parts counting
/// as zero.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a, b) = (a.trim().trim_start_matches('v'), b.trim().trim_start_matches('v'));
    if let (Ok(a), Ok(b)) = (semver::Version::parse(a), semver::Version::parse(b)) {
        return a.cmp(&b);
    }

    let parts = |v: &str| -> [u64; 3] {
        let mut out = [0; 3];
        for (slot, part) in out.iter_mut().zip(v.split('.')) {
            *slot = part.parse().unwrap_or(0);
        }
        out
    };
    parts(a).cmp(&parts(b))
}
