use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{LauncherError, Result};
use super::download::{download_all, download_file, DownloadJob, ProgressCallback};
use super::manifest::{fetch_manifest, VersionManifest};
use super::Endpoints;
use super::version::{load_version, read_version_value, version_json_path, Features, VersionJson};

/// Base URL for asset objects
pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";
/// Default maven repository for libraries without download info
pub const LIBRARIES_URL: &str = "https://libraries.minecraft.net/";

/// Asset index (`assets/indexes/<id>.json`)
#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
    /// Objects are also laid out by name under `assets/virtual/<id>`
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
    /// Objects are also laid out by name under `<game_dir>/resources`
    #[serde(default)]
    pub map_to_resources: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    #[serde(default)]
    pub size: u64,
}

impl AssetObject {
    fn relative_path(&self) -> String {
        let prefix = self.hash.get(..2).unwrap_or(&self.hash);
        format!("{}/{}", prefix, self.hash)
    }
}

pub fn natives_dir(game_dir: &Path, version_id: &str) -> PathBuf {
    game_dir.join("versions").join(version_id).join("natives")
}

pub fn client_jar_path(game_dir: &Path, version: &VersionJson) -> PathBuf {
    let jar_id = version.jar_id();
    game_dir
        .join("versions")
        .join(jar_id)
        .join(format!("{}.jar", jar_id))
}

/// Download and prepare everything needed to launch `version_id`
pub async fn install_version(
    client: &reqwest::Client,
    endpoints: &Endpoints,
    game_dir: &Path,
    version_id: &str,
    progress: &dyn ProgressCallback,
) -> Result<()> {
    info!("Installing Minecraft {} into {}", version_id, game_dir.display());

    progress.set_status("Download version metadata");
    ensure_version_chain(client, &endpoints.manifest_url, game_dir, version_id).await?;
    let version = load_version(game_dir, version_id)?;

    progress.set_status("Download client and libraries");
    let mut jobs = client_jobs(game_dir, &version);
    jobs.extend(library_jobs(game_dir, &version)?);
    let fetched = download_all(client, jobs, progress).await?;
    info!("Fetched {} client and library files", fetched);

    if let Some(index_ref) = &version.asset_index {
        progress.set_status("Download assets");
        let index_path = game_dir
            .join("assets")
            .join("indexes")
            .join(format!("{}.json", index_ref.id));
        download_file(
            client,
            &DownloadJob {
                url: index_ref.url.clone(),
                path: index_path.clone(),
                sha1: index_ref.sha1.clone(),
            },
        )
        .await?;

        let index: AssetIndex = serde_json::from_str(&tokio::fs::read_to_string(&index_path).await?)?;
        let fetched = download_all(
            client,
            asset_jobs(game_dir, &index, &endpoints.resources_url),
            progress,
        ).await?;
        info!("Fetched {} asset objects", fetched);

        if index.is_virtual || index.map_to_resources {
            let game_dir = game_dir.to_path_buf();
            let index_id = index_ref.id.clone();
            tokio::task::spawn_blocking(move || lay_out_assets(&game_dir, &index_id, &index))
                .await??;
        }
    }

    progress.set_status("Extract natives");
    let owned_dir = game_dir.to_path_buf();
    let extracted = tokio::task::spawn_blocking(move || extract_natives(&owned_dir, &version)).await??;
    info!("Extracted {} native files", extracted);

    progress.set_status("Installation complete");
    Ok(())
}

/// Make sure the metadata of `version_id` and every version it inherits
/// from is on disk.
async fn ensure_version_chain(
    client: &reqwest::Client,
    manifest_url: &str,
    game_dir: &Path,
    version_id: &str,
) -> Result<()> {
    let mut manifest: Option<VersionManifest> = None;
    let mut seen = HashSet::new();
    let mut current = version_id.to_string();

    loop {
        if !seen.insert(current.clone()) {
            return Err(LauncherError::InheritanceLoop(current));
        }

        let path = version_json_path(game_dir, &current);
        if !path.exists() {
            if manifest.is_none() {
                manifest = Some(fetch_manifest(client, manifest_url).await?);
            }
            let entry = manifest
                .as_ref()
                .and_then(|m| m.find(&current))
                .ok_or_else(|| LauncherError::VersionNotFound(current.clone()))?;

            info!("Downloading metadata for {}", current);
            download_file(
                client,
                &DownloadJob {
                    url: entry.url.clone(),
                    path,
                    sha1: entry.sha1.clone(),
                },
            )
            .await?;
        }

        let value = read_version_value(game_dir, &current)?;
        match value.get("inheritsFrom").and_then(Value::as_str) {
            Some(parent) => current = parent.to_string(),
            None => return Ok(()),
        }
    }
}

/// Client jar download, when the metadata has one
pub fn client_jobs(game_dir: &Path, version: &VersionJson) -> Vec<DownloadJob> {
    version
        .downloads
        .as_ref()
        .and_then(|d| d.client.as_ref())
        .map(|client| DownloadJob {
            url: client.url.clone(),
            path: client_jar_path(game_dir, version),
            sha1: client.sha1.clone(),
        })
        .into_iter()
        .collect()
}

/// Library and native jar downloads for the current OS
pub fn library_jobs(game_dir: &Path, version: &VersionJson) -> Result<Vec<DownloadJob>> {
    let libraries_dir = game_dir.join("libraries");
    let features = Features::default();
    let mut jobs = Vec::new();

    for library in version.libraries.iter().filter(|l| l.is_allowed(&features)) {
        let artifact = library.downloads.as_ref().and_then(|d| d.artifact.as_ref());
        match artifact {
            Some(artifact) if !artifact.url.is_empty() => {
                if let Some(path) = library.artifact_path() {
                    jobs.push(DownloadJob {
                        url: artifact.url.clone(),
                        path: libraries_dir.join(path),
                        sha1: artifact.sha1.clone(),
                    });
                }
            }
            Some(_) => {}
            None if library.is_native_only() => {}
            None => {
                if let Some(path) = library.artifact_path() {
                    let mut base = library.url.clone().unwrap_or_else(|| LIBRARIES_URL.to_string());
                    if !base.ends_with('/') {
                        base.push('/');
                    }
                    jobs.push(DownloadJob {
                        url: Url::parse(&base)?.join(&path)?.to_string(),
                        path: libraries_dir.join(path),
                        sha1: None,
                    });
                }
            }
        }

        if let Some((path, native)) = library.native_artifact() {
            jobs.push(DownloadJob {
                url: native.url.clone(),
                path: libraries_dir.join(path),
                sha1: native.sha1.clone(),
            });
        }
    }

    let mut seen = HashSet::new();
    jobs.retain(|job| seen.insert(job.path.clone()));
    Ok(jobs)
}

/// Downloads for every object in an asset index
pub fn asset_jobs(game_dir: &Path, index: &AssetIndex, resources_url: &str) -> Vec<DownloadJob> {
    let objects_dir = game_dir.join("assets").join("objects");
    let mut seen = HashSet::new();

    index
        .objects
        .values()
        .filter(|object| seen.insert(object.hash.clone()))
        .map(|object| {
            let relative = object.relative_path();
            DownloadJob {
                url: format!("{}/{}", resources_url.trim_end_matches('/'), relative),
                path: objects_dir.join(&relative),
                sha1: Some(object.hash.clone()),
            }
        })
        .collect()
}

/// Copy objects to their named locations for pre-1.7 versions
fn lay_out_assets(game_dir: &Path, index_id: &str, index: &AssetIndex) -> Result<()> {
    let objects_dir = game_dir.join("assets").join("objects");
    let targets: Vec<PathBuf> = [
        index.is_virtual.then(|| game_dir.join("assets").join("virtual").join(index_id)),
        index.map_to_resources.then(|| game_dir.join("resources")),
    ]
    .into_iter()
    .flatten()
    .collect();

    for (name, object) in &index.objects {
        let source = objects_dir.join(object.relative_path());
        for target_dir in &targets {
            let target = target_dir.join(name);
            if target.exists() {
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&source, &target)?;
        }
    }
    Ok(())
}

/// Unpack native libraries into `versions/<id>/natives`.
///
/// Returns the number of files written.
pub fn extract_natives(game_dir: &Path, version: &VersionJson) -> Result<usize> {
    let libraries_dir = game_dir.join("libraries");
    let target_dir = natives_dir(game_dir, &version.id);
    let features = Features::default();
    let mut written = 0;

    for library in version.libraries.iter().filter(|l| l.is_allowed(&features)) {
        let Some((path, _)) = library.native_artifact() else {
            continue;
        };
        let jar_path = libraries_dir.join(path);
        let exclude = library
            .extract
            .as_ref()
            .map(|e| e.exclude.as_slice())
            .unwrap_or_default();

        let file = match fs::File::open(&jar_path) {
            Ok(file) => file,
            Err(e) => {
                warn!("Missing native library {}: {}", jar_path.display(), e);
                continue;
            }
        };
        let mut archive = zip::ZipArchive::new(file)?;
        fs::create_dir_all(&target_dir)?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            if entry.is_dir()
                || name.starts_with("META-INF/")
                || exclude.iter().any(|prefix| name.starts_with(prefix.as_str()))
            {
                continue;
            }
            let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
                warn!("Skipping unsafe path {} in {}", name, jar_path.display());
                continue;
            };

            let out_path = target_dir.join(relative);
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = fs::File::create(&out_path)?;
            io::copy(&mut entry, &mut out)?;
            written += 1;
        }
    }

    Ok(written)
}
