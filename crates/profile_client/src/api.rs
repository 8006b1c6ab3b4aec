use anyhow::Result;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use shared::{
    domain::{UserId, UserRecord},
    error::{ApiError, ErrorCode},
    protocol::{delete_user_route, update_user_route, BackendFailure},
};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{config::Settings, form::PendingFormEdits};

/// Why a user request did not succeed. Both variants carry only the
/// human-readable message the view renders.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestFailure {
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Transport(String),
}

impl RequestFailure {
    pub fn message(&self) -> &str {
        match self {
            RequestFailure::Rejected(message) | RequestFailure::Transport(message) => message,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, RequestFailure::Transport(_))
    }
}

impl From<&RequestFailure> for ApiError {
    fn from(value: &RequestFailure) -> Self {
        let code = match value {
            RequestFailure::Rejected(_) => ErrorCode::Rejected,
            RequestFailure::Transport(_) => ErrorCode::Transport,
        };
        ApiError::new(code, value.message())
    }
}

pub fn build_http_client(settings: &Settings) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = settings.request_timeout() {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

#[derive(Clone)]
pub struct ProfileApi {
    http: Client,
    base_url: String,
}

impl ProfileApi {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn update_user(
        &self,
        user_id: &UserId,
        edits: &PendingFormEdits,
    ) -> Result<UserRecord, RequestFailure> {
        info!(
            user_id = %user_id,
            fields = ?edits.field_names(),
            "api: update_user"
        );
        let request = self
            .http
            .post(format!("{}{}", self.base_url, update_user_route(&user_id.0)))
            .json(edits);
        send_and_interpret(request, "update_user").await
    }

    /// The success payload is returned as-is; callers usually discard it.
    pub async fn delete_user(&self, user_id: &UserId) -> Result<serde_json::Value, RequestFailure> {
        info!(user_id = %user_id, "api: delete_user");
        let request = self
            .http
            .delete(format!("{}{}", self.base_url, delete_user_route(&user_id.0)));
        send_and_interpret(request, "delete_user").await
    }
}

async fn send_and_interpret<T: DeserializeOwned>(
    request: RequestBuilder,
    operation: &'static str,
) -> Result<T, RequestFailure> {
    let response = request.send().await.map_err(|err| {
        error!(operation, "api: request failed: {err}");
        RequestFailure::Transport(err.to_string())
    })?;
    let status = response.status();
    let body = response.text().await.map_err(|err| {
        error!(operation, %status, "api: reading response failed: {err}");
        RequestFailure::Transport(err.to_string())
    })?;
    interpret_response(&body).inspect_err(|failure| match failure {
        RequestFailure::Rejected(message) => {
            warn!(operation, %status, "api: rejected by backend: {message}")
        }
        RequestFailure::Transport(message) => {
            error!(operation, %status, "api: unusable response: {message}")
        }
    })
}

/// Interprets a user-endpoint body. The HTTP status is not consulted: only
/// an explicit `success: false` counts as a rejection.
pub fn interpret_response<T: DeserializeOwned>(body: &str) -> Result<T, RequestFailure> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|err| RequestFailure::Transport(err.to_string()))?;
    if let Some(failure) = BackendFailure::from_body(&value) {
        return Err(RequestFailure::Rejected(failure.message));
    }
    serde_json::from_value(value).map_err(|err| RequestFailure::Transport(err.to_string()))
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
