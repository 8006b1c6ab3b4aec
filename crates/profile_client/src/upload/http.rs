use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error};
use url::Url;

use super::{DownloadUrl, ObjectStorage, StoredObject, TransferEvent, UploadTask};
use crate::config::Settings;

const UPLOAD_PROTOCOL_HEADER: &str = "X-Goog-Upload-Protocol";
const UPLOAD_COMMAND_HEADER: &str = "X-Goog-Upload-Command";
const UPLOAD_OFFSET_HEADER: &str = "X-Goog-Upload-Offset";
const UPLOAD_URL_HEADER: &str = "X-Goog-Upload-URL";
const UPLOAD_CONTENT_LENGTH_HEADER: &str = "X-Goog-Upload-Header-Content-Length";
const UPLOAD_CONTENT_TYPE_HEADER: &str = "X-Goog-Upload-Header-Content-Type";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    name: String,
    bucket: String,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    download_tokens: Option<String>,
}

impl ObjectMetadata {
    fn into_stored(self, fallback_size: u64) -> StoredObject {
        let size_bytes = self
            .size
            .as_deref()
            .and_then(|size| size.parse::<u64>().ok())
            .unwrap_or(fallback_size);
        let download_token = self
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next())
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string);
        StoredObject {
            key: self.name,
            bucket: self.bucket,
            size_bytes,
            download_token,
        }
    }
}

/// Resumable uploads against a Firebase-Storage style REST endpoint.
#[derive(Clone)]
pub struct HttpObjectStorage {
    http: Client,
    endpoint: String,
    bucket: String,
    chunk_size: usize,
}

impl HttpObjectStorage {
    pub fn new(
        http: Client,
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        chunk_size: usize,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn from_settings(http: Client, settings: &Settings) -> Self {
        Self::new(
            http,
            settings.storage_endpoint.clone(),
            settings.storage_bucket.clone(),
            settings.upload_chunk_size,
        )
    }

    fn objects_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint)
            .with_context(|| format!("invalid storage endpoint '{}'", self.endpoint))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("storage endpoint cannot be a base: {}", self.endpoint))?
            .pop_if_empty()
            .extend(["v0", "b", self.bucket.as_str(), "o"]);
        Ok(url)
    }

    async fn open_session(&self, key: &str, total_bytes: usize, content_type: &str) -> Result<String> {
        let response = self
            .http
            .post(self.objects_url()?)
            .query(&[("name", key)])
            .header(UPLOAD_PROTOCOL_HEADER, "resumable")
            .header(UPLOAD_COMMAND_HEADER, "start")
            .header(UPLOAD_CONTENT_LENGTH_HEADER, total_bytes.to_string())
            .header(UPLOAD_CONTENT_TYPE_HEADER, content_type)
            .json(&serde_json::json!({ "name": key, "contentType": content_type }))
            .send()
            .await?
            .error_for_status()?;
        session_url_from_headers(response.headers())
    }
}

fn session_url_from_headers(headers: &HeaderMap) -> Result<String> {
    headers
        .get(UPLOAD_URL_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("storage did not return a resumable session url"))
}

async fn send_chunks(
    http: Client,
    session_url: String,
    bytes: Vec<u8>,
    chunk_size: usize,
    events: &mpsc::Sender<TransferEvent>,
) -> Result<StoredObject> {
    let total_bytes = bytes.len() as u64;
    let mut offset = 0usize;

    loop {
        let end = (offset + chunk_size).min(bytes.len());
        let is_last = end == bytes.len();
        let command = if is_last { "upload, finalize" } else { "upload" };

        let response = http
            .post(&session_url)
            .header(UPLOAD_COMMAND_HEADER, command)
            .header(UPLOAD_OFFSET_HEADER, offset.to_string())
            .body(bytes[offset..end].to_vec())
            .send()
            .await?
            .error_for_status()?;

        offset = end;
        debug!(offset, total_bytes, "storage: chunk accepted");
        // The receiver may have gone away with its session; keep uploading.
        let _ = events
            .send(TransferEvent::Progress {
                bytes_transferred: offset as u64,
                total_bytes,
            })
            .await;

        if is_last {
            let metadata: ObjectMetadata = response
                .json()
                .await
                .context("storage returned malformed object metadata")?;
            return Ok(metadata.into_stored(total_bytes));
        }
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn start_upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadTask> {
        let session_url = self.open_session(key, bytes.len(), content_type).await?;
        let (tx, task) = UploadTask::channel();
        let http = self.http.clone();
        let chunk_size = self.chunk_size;
        let key = key.to_string();

        tokio::spawn(async move {
            let terminal = match send_chunks(http, session_url, bytes, chunk_size, &tx).await {
                Ok(object) => TransferEvent::Completed(object),
                Err(err) => {
                    error!(key = %key, "storage: resumable upload failed: {err:#}");
                    TransferEvent::Failed {
                        reason: format!("{err:#}"),
                    }
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
            .ok_or_else(|| anyhow!("object '{}' has no download token", object.key))?;
        let mut url = Url::parse(&self.endpoint)
            .with_context(|| format!("invalid storage endpoint '{}'", self.endpoint))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("storage endpoint cannot be a base: {}", self.endpoint))?
            .pop_if_empty()
            .extend(["v0", "b", object.bucket.as_str(), "o", object.key.as_str()]);
        url.query_pairs_mut()
            .append_pair("alt", "media")
            .append_pair("token", token);
        Ok(DownloadUrl::from(url))
    }
}
