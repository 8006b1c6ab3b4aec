//! One open profile screen: pending edits, the avatar upload, and the
//! update/delete requests, all reflected into the shared [`UserStore`].

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use shared::{
    domain::{UserId, UserRecord},
    error::{ApiError, ErrorCode},
};
use thiserror::Error;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info};

use crate::{
    api::{ProfileApi, RequestFailure},
    form::{EditableField, PendingFormEdits},
    store::{UserAction, UserStore},
    upload::{AvatarUploader, DownloadUrl, PickedFile, UploadError, UploadStatus},
    view::ProfileView,
};

pub const UPDATE_SUCCESS_NOTICE: &str = "User Information Updated Successfully!";
pub const DELETE_SUCCESS_NOTICE: &str = "User has been Deleted Successfully!";
const NOTICE_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeIcon {
    Delete,
}

/// A transient toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub icon: Option<NoticeIcon>,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
            icon: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: NoticeIcon) -> Self {
        self.icon = Some(icon);
        self
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("another profile operation is still in flight")]
    OperationInFlight,
    #[error("no user is signed in")]
    NotSignedIn,
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Request(#[from] RequestFailure),
}

impl From<&SessionError> for ApiError {
    fn from(value: &SessionError) -> Self {
        match value {
            SessionError::OperationInFlight => ApiError::new(ErrorCode::Busy, value.to_string()),
            SessionError::NotSignedIn => ApiError::new(ErrorCode::NotSignedIn, value.to_string()),
            SessionError::Upload(err) => ApiError::new(ErrorCode::Upload, err.to_string()),
            SessionError::Request(failure) => ApiError::from(failure),
        }
    }
}

/// Held for the duration of one upload or request; at most one exists per
/// session at a time.
struct OperationGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> OperationGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, SessionError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SessionError::OperationInFlight)?;
        Ok(Self { flag })
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct ProfileSession {
    store: Arc<UserStore>,
    api: ProfileApi,
    uploader: AvatarUploader,
    edits: Mutex<PendingFormEdits>,
    upload_status: watch::Sender<UploadStatus>,
    busy: AtomicBool,
    notices: broadcast::Sender<Notice>,
}

impl ProfileSession {
    pub fn new(store: Arc<UserStore>, api: ProfileApi, uploader: AvatarUploader) -> Arc<Self> {
        let (upload_status, _) = watch::channel(UploadStatus::Idle);
        let (notices, _) = broadcast::channel(NOTICE_BUFFER);
        Arc::new(Self {
            store,
            api,
            uploader,
            edits: Mutex::new(PendingFormEdits::new()),
            upload_status,
            busy: AtomicBool::new(false),
            notices,
        })
    }

    pub fn store(&self) -> &Arc<UserStore> {
        &self.store
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub fn subscribe_upload_status(&self) -> watch::Receiver<UploadStatus> {
        self.upload_status.subscribe()
    }

    pub fn upload_status(&self) -> UploadStatus {
        self.upload_status.borrow().clone()
    }

    pub async fn edits(&self) -> PendingFormEdits {
        self.edits.lock().await.clone()
    }

    pub async fn handle_change(&self, field: EditableField, value: impl Into<String>) {
        self.edits.lock().await.handle_change(field, value);
    }

    pub async fn view(&self) -> ProfileView {
        let edits = self.edits().await;
        let state = self.store.snapshot().await;
        ProfileView::project(&edits, &self.upload_status(), &state)
    }

    /// Uploads `file` as the new avatar. On success the resolved download
    /// URL becomes the pending `avatar`; on failure edits are untouched.
    pub async fn request_upload(&self, file: PickedFile) -> Result<DownloadUrl, SessionError> {
        let _guard = OperationGuard::acquire(&self.busy)?;
        let url = self.uploader.upload(file, &self.upload_status).await?;
        self.edits.lock().await.set_avatar(&url);
        Ok(url)
    }

    pub async fn submit(&self) -> Result<UserRecord, SessionError> {
        let _guard = OperationGuard::acquire(&self.busy)?;
        let user_id = self.current_user_id().await?;
        self.begin(UserAction::UpdateStart).await?;
        let edits = self.edits().await;
        match self.api.update_user(&user_id, &edits).await {
            Ok(user) => {
                self.store
                    .dispatch(UserAction::UpdateSuccess(user.clone()))
                    .await;
                self.notify(Notice::success(UPDATE_SUCCESS_NOTICE));
                Ok(user)
            }
            Err(failure) => {
                self.store
                    .dispatch(UserAction::UpdateFailure(failure.message().to_string()))
                    .await;
                if failure.is_transport() {
                    self.notify(Notice::error(failure.message()));
                }
                Err(failure.into())
            }
        }
    }

    /// Deletes the signed-in account. The store drops its user on success;
    /// ending the wider session is left to the caller.
    pub async fn delete_account(&self) -> Result<(), SessionError> {
        let _guard = OperationGuard::acquire(&self.busy)?;
        let user_id = self.current_user_id().await?;
        self.begin(UserAction::DeleteStart).await?;
        match self.api.delete_user(&user_id).await {
            Ok(_) => {
                self.store.dispatch(UserAction::DeleteSuccess).await;
                self.notify(Notice::success(DELETE_SUCCESS_NOTICE).with_icon(NoticeIcon::Delete));
                Ok(())
            }
            Err(failure) => {
                self.store
                    .dispatch(UserAction::DeleteFailure(failure.message().to_string()))
                    .await;
                if failure.is_transport() {
                    self.notify(Notice::error(failure.message()));
                }
                Err(failure.into())
            }
        }
    }

    /// Refused while any session sharing the store has a request loading.
    async fn begin(&self, start: UserAction) -> Result<(), SessionError> {
        self.store
            .try_begin(start)
            .await
            .map(|_| ())
            .ok_or(SessionError::OperationInFlight)
    }

    async fn current_user_id(&self) -> Result<UserId, SessionError> {
        self.store
            .snapshot()
            .await
            .current_user
            .map(|user| user.id)
            .ok_or(SessionError::NotSignedIn)
    }

    fn notify(&self, notice: Notice) {
        info!(level = ?notice.level, text = %notice.text, "session: notice");
        if self.notices.send(notice).is_err() {
            debug!("session: notice dropped, nobody is listening");
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
