//! Avatar uploads: the object-storage seam, the progress reporter that
//! drives one transfer, and the status type the view renders from.

use std::{fmt, fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use url::Url;

mod http;
pub use http::HttpObjectStorage;

/// Storage-side policy: objects must be smaller than this and `image/*`.
/// The client never checks it before uploading.
pub const UPLOAD_SIZE_LIMIT_BYTES: u64 = 2 * 1024 * 1024;
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const TRANSFER_EVENT_BUFFER: usize = 64;

/// A fetchable public URL for a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadUrl(Url);

impl DownloadUrl {
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        Url::parse(raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }
}

impl From<Url> for DownloadUrl {
    fn from(value: Url) -> Self {
        Self(value)
    }
}

impl fmt::Display for DownloadUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadStatus {
    #[default]
    Idle,
    Uploading {
        percent: u8,
    },
    Failed {
        last_percent: u8,
    },
    Complete {
        url: DownloadUrl,
    },
}

impl UploadStatus {
    pub fn percent(&self) -> u8 {
        match self {
            UploadStatus::Idle => 0,
            UploadStatus::Uploading { percent } => *percent,
            UploadStatus::Failed { last_percent } => *last_percent,
            UploadStatus::Complete { .. } => 100,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, UploadStatus::Uploading { .. })
    }
}

/// A file the user picked, read fully into memory.
#[derive(Debug, Clone)]
pub struct PickedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl PickedFile {
    /// Reads a file from disk, guessing its content type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .with_context(|| format!("'{}' has no file name", path.display()))?;
        let content_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub bucket: String,
    pub size_bytes: u64,
    pub download_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    Progress {
        bytes_transferred: u64,
        total_bytes: u64,
    },
    Failed {
        reason: String,
    },
    Completed(StoredObject),
}

/// Event stream of one running transfer. Ends with exactly one
/// `Failed` or `Completed` event.
pub struct UploadTask {
    events: mpsc::Receiver<TransferEvent>,
}

impl UploadTask {
    pub fn channel() -> (mpsc::Sender<TransferEvent>, Self) {
        let (tx, events) = mpsc::channel(TRANSFER_EVENT_BUFFER);
        (tx, Self { events })
    }

    pub async fn next_event(&mut self) -> Option<TransferEvent> {
        self.events.recv().await
    }
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn start_upload(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<UploadTask>;
    async fn download_url(&self, object: &StoredObject) -> Result<DownloadUrl>;
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to start upload: {0}")]
    Start(String),
    #[error("upload failed: {0}")]
    Transfer(String),
    #[error("upload ended without a result")]
    Interrupted,
    #[error("failed to resolve download url: {0}")]
    ResolveUrl(String),
}

/// Object key for an upload: upload time in unix millis immediately
/// followed by the original file name.
pub fn object_key(uploaded_at: DateTime<Utc>, file_name: &str) -> String {
    format!("{}{}", uploaded_at.timestamp_millis(), file_name)
}

pub fn progress_percent(bytes_transferred: u64, total_bytes: u64) -> u8 {
    if total_bytes == 0 {
        return 100;
    }
    let ratio = bytes_transferred.min(total_bytes) as f64 / total_bytes as f64;
    (ratio * 100.0).round() as u8
}

pub struct AvatarUploader {
    storage: Arc<dyn ObjectStorage>,
}

impl AvatarUploader {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    pub async fn upload(
        &self,
        file: PickedFile,
        status: &watch::Sender<UploadStatus>,
    ) -> Result<DownloadUrl, UploadError> {
        self.upload_at(file, Utc::now(), status).await
    }

    /// Runs one transfer to completion, mirroring its progress into
    /// `status`. No retry: a failed upload needs a fresh request.
    pub async fn upload_at(
        &self,
        file: PickedFile,
        uploaded_at: DateTime<Utc>,
        status: &watch::Sender<UploadStatus>,
    ) -> Result<DownloadUrl, UploadError> {
        let key = object_key(uploaded_at, &file.file_name);
        let content_type = file
            .content_type
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        info!(
            key = %key,
            content_type = %content_type,
            size_bytes = file.bytes.len(),
            "upload: starting"
        );
        status.send_replace(UploadStatus::Uploading { percent: 0 });

        let mut task = match self
            .storage
            .start_upload(&key, file.bytes, &content_type)
            .await
        {
            Ok(task) => task,
            Err(err) => {
                warn!(key = %key, "upload: start rejected: {err:#}");
                mark_failed(status);
                return Err(UploadError::Start(format!("{err:#}")));
            }
        };

        let object = loop {
            match task.next_event().await {
                Some(TransferEvent::Progress {
                    bytes_transferred,
                    total_bytes,
                }) => {
                    let percent = progress_percent(bytes_transferred, total_bytes);
                    debug!(key = %key, percent, "upload: progress");
                    status.send_replace(UploadStatus::Uploading { percent });
                }
                Some(TransferEvent::Failed { reason }) => {
                    warn!(key = %key, "upload: transfer failed: {reason}");
                    mark_failed(status);
                    return Err(UploadError::Transfer(reason));
                }
                Some(TransferEvent::Completed(object)) => break object,
                None => {
                    warn!(key = %key, "upload: event stream closed before completion");
                    mark_failed(status);
                    return Err(UploadError::Interrupted);
                }
            }
        };

        let url = match self.storage.download_url(&object).await {
            Ok(url) => url,
            Err(err) => {
                warn!(key = %key, "upload: download url unavailable: {err:#}");
                mark_failed(status);
                return Err(UploadError::ResolveUrl(format!("{err:#}")));
            }
        };
        info!(key = %key, url = %url, "upload: complete");
        status.send_replace(UploadStatus::Complete { url: url.clone() });
        Ok(url)
    }
}

fn mark_failed(status: &watch::Sender<UploadStatus>) {
    status.send_modify(|current| {
        let last_percent = current.percent();
        *current = UploadStatus::Failed { last_percent };
    });
}

#[cfg(test)]
#[path = "../tests/upload_tests.rs"]
mod tests;
