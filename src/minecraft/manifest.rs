use chrono::{DateTime, NaiveDate};
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use super::Endpoints;
use crate::error::Result;

/// Mojang's list of every published game version
pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

#[derive(Debug, Clone, Deserialize)]
pub struct VersionManifest {
    #[serde(default)]
    pub latest: Option<LatestVersions>,
    pub versions: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(default)]
    pub release_time: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionManifest {
    pub fn find(&self, version_id: &str) -> Option<&ManifestEntry> {
        self.versions.iter().find(|v| v.id == version_id)
    }
}

/// A version that can be offered for launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSummary {
    pub id: String,
    /// `release`, `snapshot`, `old_beta`, `old_alpha` or a custom type
    pub version_type: String,
    /// Raw ISO-8601 timestamp, empty when unknown
    pub release_time: String,
    /// Metadata URL, `None` for versions only installed locally
    pub url: Option<String>,
}

impl VersionSummary {
    pub fn release_date(&self) -> Option<NaiveDate> {
        DateTime::parse_from_rfc3339(&self.release_time)
            .ok()
            .map(|t| t.date_naive())
    }
}

impl From<&ManifestEntry> for VersionSummary {
    fn from(entry: &ManifestEntry) -> Self {
        Self {
            id: entry.id.clone(),
            version_type: entry.version_type.clone(),
            release_time: entry.release_time.clone(),
            url: Some(entry.url.clone()),
        }
    }
}

/// Download the version manifest
pub async fn fetch_manifest(client: &reqwest::Client, url: &str) -> Result<VersionManifest> {
    info!("Fetching version manifest from {}", url);
    let manifest = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json::<VersionManifest>()
        .await?;
    Ok(manifest)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalVersionHeader {
    id: String,
    #[serde(default, rename = "type")]
    version_type: String,
    #[serde(default)]
    release_time: String,
}

/// Versions installed under `<game_dir>/versions`
pub fn local_versions(game_dir: &Path) -> Vec<VersionSummary> {
    let versions_dir = game_dir.join("versions");
    if !versions_dir.is_dir() {
        return Vec::new();
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(&versions_dir)
        .min_depth(2)
        .max_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let dir_name = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str());
        let file_name = path.file_name().and_then(|n| n.to_str());
        let (Some(dir_name), Some(file_name)) = (dir_name, file_name) else {
            continue;
        };
        if file_name != format!("{}.json", dir_name) {
            continue;
        }

        let header = fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|s| serde_json::from_str::<LocalVersionHeader>(&s).map_err(Into::into));
        match header {
            Ok(header) => found.push(VersionSummary {
                id: header.id,
                version_type: header.version_type,
                release_time: header.release_time,
                url: None,
            }),
            Err(e) => warn!("Skipping unreadable version file {}: {}", path.display(), e),
        }
    }

    found
}

/// Combine remote and local versions: first occurrence of an id wins,
/// newest release first.
pub fn merge_versions(
    remote: Vec<VersionSummary>,
    local: Vec<VersionSummary>,
) -> Vec<VersionSummary> {
    let mut seen = HashSet::new();
    let mut versions: Vec<VersionSummary> = remote
        .into_iter()
        .chain(local)
        .filter(|v| seen.insert(v.id.clone()))
        .collect();

    versions.sort_by(|a, b| b.release_time.cmp(&a.release_time));
    versions
}

/// All versions that can be launched, newest first
pub async fn available_versions(
    client: &reqwest::Client,
    endpoints: &Endpoints,
    game_dir: &Path,
) -> Result<Vec<VersionSummary>> {
    let scan_dir = game_dir.to_path_buf();
    let local = tokio::task::spawn_blocking(move || local_versions(&scan_dir)).await?;

    let remote = match fetch_manifest(client, &endpoints.manifest_url).await {
        Ok(manifest) => {
            if let Some(latest) = &manifest.latest {
                info!("Latest release {}, latest snapshot {}", latest.release, latest.snapshot);
            }
            manifest.versions.iter().map(VersionSummary::from).collect()
        }
        Err(e) if !local.is_empty() => {
            warn!("Could not fetch version manifest, showing installed versions only: {}", e);
            Vec::new()
        }
        Err(e) => return Err(e),
    };

    info!("Found {} remote and {} local versions.", remote.len(), local.len());
    let versions = merge_versions(remote, local);
    info!("Processed {} unique versions.", versions.len());
    Ok(versions)
}

/// Index to preselect: the saved version if listed, otherwise the newest
pub fn preselect(versions: &[VersionSummary], saved: Option<&str>) -> Option<usize> {
    if let Some(saved) = saved {
        if let Some(index) = versions.iter().position(|v| v.id == saved) {
            return Some(index);
        }
    }
    if versions.is_empty() {
        None
    } else {
        Some(0)
    }
}
