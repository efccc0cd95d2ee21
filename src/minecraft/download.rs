use futures::stream::{self, StreamExt};
use log::debug;
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Mutex;

use crate::error::{LauncherError, Result};

/// Files fetched at the same time
pub const MAX_CONCURRENT_DOWNLOADS: usize = 8;

/// Receives installation progress
pub trait ProgressCallback: Send + Sync {
    fn set_status(&self, status: &str);
    fn set_max(&self, max: u64);
    fn set_progress(&self, progress: u64);
}

/// Progress sink that only writes debug logs
#[derive(Debug, Default)]
pub struct LoggingProgress {
    total: AtomicU64,
}

impl ProgressCallback for LoggingProgress {
    fn set_status(&self, status: &str) {
        debug!("Download Status: {}", status);
    }

    fn set_max(&self, max: u64) {
        self.total.store(max, Ordering::Relaxed);
        debug!("Download Max Set: {}", max);
    }

    fn set_progress(&self, progress: u64) {
        let total = self.total.load(Ordering::Relaxed);
        if total > 0 {
            let percentage = progress as f64 / total as f64 * 100.0;
            debug!("Download Progress: {}/{} ({:.2}%)", progress, total, percentage);
        } else {
            debug!("Download Progress: {}", progress);
        }
    }
}

/// Installation progress message
#[derive(Debug, Clone, PartialEq)]
pub enum InstallStatus {
    Status(String),
    Max(u64),
    Progress(u64),
}

/// Progress sink forwarding every update over a channel, and to the log
pub struct ChannelProgress<T> {
    log: LoggingProgress,
    tx: Mutex<Sender<T>>,
    wrap: fn(InstallStatus) -> T,
}

impl<T> ChannelProgress<T> {
    pub fn new(tx: Sender<T>, wrap: fn(InstallStatus) -> T) -> Self {
        Self {
            log: LoggingProgress::default(),
            tx: Mutex::new(tx),
            wrap,
        }
    }

    fn send(&self, status: InstallStatus) {
        if let Ok(tx) = self.tx.lock() {
            // The receiver goes away when the window closes mid-install
            let _ = tx.send((self.wrap)(status));
        }
    }
}

impl<T: Send> ProgressCallback for ChannelProgress<T> {
    fn set_status(&self, status: &str) {
        self.log.set_status(status);
        self.send(InstallStatus::Status(status.to_string()));
    }

    fn set_max(&self, max: u64) {
        self.log.set_max(max);
        self.send(InstallStatus::Max(max));
    }

    fn set_progress(&self, progress: u64) {
        self.log.set_progress(progress);
        self.send(InstallStatus::Progress(progress));
    }
}

/// One file to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub url: String,
    pub path: PathBuf,
    /// Expected hex SHA-1, when the metadata provides one
    pub sha1: Option<String>,
}

pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

pub fn sha1_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha1::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Whether `path` already holds the expected content
pub fn is_up_to_date(path: &Path, sha1: Option<&str>) -> std::io::Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    match sha1 {
        Some(expected) => Ok(sha1_file(path)?.eq_ignore_ascii_case(expected)),
        None => Ok(true),
    }
}

/// Fetch a single file unless it is already present.
///
/// Returns `true` if the file was downloaded.
pub async fn download_file(client: &reqwest::Client, job: &DownloadJob) -> Result<bool> {
    let check_path = job.path.clone();
    let check_sha1 = job.sha1.clone();
    let up_to_date =
        tokio::task::spawn_blocking(move || is_up_to_date(&check_path, check_sha1.as_deref()))
            .await??;
    if up_to_date {
        return Ok(false);
    }

    debug!("Downloading {} to {}", job.url, job.path.display());
    let bytes = client
        .get(&job.url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    if let Some(expected) = &job.sha1 {
        let actual = sha1_hex(&bytes);
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(LauncherError::HashMismatch {
                path: job.path.clone(),
                expected: expected.clone(),
                actual,
            });
        }
    }

    if let Some(parent) = job.path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&job.path, &bytes).await?;
    Ok(true)
}

/// Fetch all jobs, a few at a time, reporting one progress step per file
pub async fn download_all(
    client: &reqwest::Client,
    jobs: Vec<DownloadJob>,
    progress: &dyn ProgressCallback,
) -> Result<usize> {
    progress.set_max(jobs.len() as u64);
    progress.set_progress(0);

    let mut results = stream::iter(jobs)
        .map(|job| async move { download_file(client, &job).await })
        .buffer_unordered(MAX_CONCURRENT_DOWNLOADS);

    let mut done = 0;
    let mut fetched = 0;
    while let Some(result) = results.next().await {
        if result? {
            fetched += 1;
        }
        done += 1;
        progress.set_progress(done);
    }

    Ok(fetched)
}
