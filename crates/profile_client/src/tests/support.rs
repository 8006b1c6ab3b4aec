//! Test doubles shared by the unit tests of several modules.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Map;
use shared::domain::{UserId, UserRecord};
use tokio::sync::{Mutex, Notify};

use crate::upload::{
    DownloadUrl, ObjectStorage, PickedFile, StoredObject, TransferEvent, UploadTask,
    UPLOAD_SIZE_LIMIT_BYTES,
};

pub(crate) const MEMORY_STORAGE_HOST: &str = "storage.test.local";

/// In-memory storage applying the bucket policy (size limit, `image/*`)
/// the way the real bucket does: the transfer runs, then gets refused.
pub(crate) struct MemoryStorage {
    chunk_size: usize,
    pub(crate) started_keys: Arc<Mutex<Vec<String>>>,
    gate: Option<Arc<Notify>>,
}

impl MemoryStorage {
    pub(crate) fn new() -> Self {
        Self {
            chunk_size: 64 * 1024,
            started_keys: Arc::new(Mutex::new(Vec::new())),
            gate: None,
        }
    }

    /// Holds every transfer before its terminal event until `gate` is
    /// notified.
    pub(crate) fn gated(gate: Arc<Notify>) -> Self {
        let mut storage = Self::new();
        storage.gate = Some(gate);
        storage
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn start_upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadTask> {
        self.started_keys.lock().await.push(key.to_string());
        let (tx, task) = UploadTask::channel();
        let total = bytes.len() as u64;
        let allowed = total < UPLOAD_SIZE_LIMIT_BYTES && content_type.starts_with("image/");
        let chunk_size = self.chunk_size as u64;
        let gate = self.gate.clone();
        let key = key.to_string();

        tokio::spawn(async move {
            let mut sent = 0u64;
            while sent < total {
                let next = (sent + chunk_size).min(total);
                if next == total && !allowed {
                    break;
                }
                sent = next;
                let _ = tx
                    .send(TransferEvent::Progress {
                        bytes_transferred: sent,
                        total_bytes: total,
                    })
                    .await;
            }
            if let Some(gate) = gate {
                gate.notified().await;
            }
            let terminal = if allowed {
                TransferEvent::Completed(StoredObject {
                    key,
                    bucket: "memory".to_string(),
                    size_bytes: total,
                    download_token: Some("tok".to_string()),
                })
            } else {
                TransferEvent::Failed {
                    reason: "Permission denied by storage rules".to_string(),
                }
            };
            let _ = tx.send(terminal).await;
        });

        Ok(task)
    }

    async fn download_url(&self, object: &StoredObject) -> Result<DownloadUrl> {
        let token = object
            .download_token
            .as_deref()
            .ok_or_else(|| anyhow!("missing token"))?;
        DownloadUrl::parse(&format!(
            "https://{MEMORY_STORAGE_HOST}/{}/{}?token={token}",
            object.bucket, object.key
        ))
        .map_err(|e| anyhow!("bad url: {e}"))
    }
}

pub(crate) fn image_file(name: &str, size_bytes: usize) -> PickedFile {
    PickedFile {
        file_name: name.to_string(),
        content_type: Some("image/png".to_string()),
        bytes: vec![7u8; size_bytes],
    }
}

pub(crate) fn sample_user() -> UserRecord {
    UserRecord {
        id: UserId::from("65f0c1a2b3"),
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        avatar: Some("https://cdn.example.com/default.png".to_string()),
        extra: Map::new(),
    }
}
