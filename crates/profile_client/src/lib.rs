//! Client side of the profile screen: edit the signed-in user, upload a new
//! avatar to object storage, and update or delete the account.

pub mod api;
pub mod config;
pub mod form;
pub mod session;
pub mod store;
pub mod upload;
pub mod view;

pub use api::{build_http_client, ProfileApi, RequestFailure};
pub use config::{load_settings, Settings};
pub use form::{EditableField, PendingFormEdits};
pub use session::{Notice, NoticeIcon, NoticeLevel, ProfileSession, SessionError};
pub use store::{reduce, UserAction, UserState, UserStore};
pub use upload::{
    AvatarUploader, DownloadUrl, HttpObjectStorage, ObjectStorage, PickedFile, UploadStatus,
};
pub use view::{ProfileView, SubmitButton, UploadCaption};

use std::sync::Arc;

use anyhow::Result;

/// Wires a session against the configured backend and bucket.
pub fn connect(settings: &Settings, store: Arc<UserStore>) -> Result<Arc<ProfileSession>> {
    let http = build_http_client(settings)?;
    let storage = HttpObjectStorage::from_settings(http.clone(), settings);
    Ok(ProfileSession::new(
        store,
        ProfileApi::new(http, settings.api_base_url.clone()),
        AvatarUploader::new(Arc::new(storage)),
    ))
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod tests_support;
