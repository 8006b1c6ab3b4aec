//! What the profile screen shows, computed from the session and the store
//! without touching any UI toolkit.

use crate::{form::PendingFormEdits, store::UserState, upload::UploadStatus};

pub const UPLOAD_ERROR_CAPTION: &str = "Error Image Upload(image size must be less than 2mb)";
pub const UPLOAD_DONE_CAPTION: &str = "Image Uploaded Successfully!";
pub const SUBMIT_LABEL: &str = "Update";
pub const SUBMIT_BUSY_LABEL: &str = "Updating Info...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadCaption {
    Blank,
    Progress(u8),
    Done,
    Error,
}

impl UploadCaption {
    /// Error beats in-progress, which beats done, which beats blank.
    pub fn from_status(status: &UploadStatus) -> Self {
        match status {
            UploadStatus::Failed { .. } => UploadCaption::Error,
            UploadStatus::Uploading { percent } if *percent > 0 && *percent < 100 => {
                UploadCaption::Progress(*percent)
            }
            UploadStatus::Uploading { percent: 100 } | UploadStatus::Complete { .. } => {
                UploadCaption::Done
            }
            UploadStatus::Uploading { .. } | UploadStatus::Idle => UploadCaption::Blank,
        }
    }

    pub fn text(self) -> String {
        match self {
            UploadCaption::Blank => String::new(),
            UploadCaption::Progress(percent) => format!("Uploading {percent}%"),
            UploadCaption::Done => UPLOAD_DONE_CAPTION.to_string(),
            UploadCaption::Error => UPLOAD_ERROR_CAPTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitButton {
    pub enabled: bool,
    pub label: &'static str,
}

impl SubmitButton {
    pub fn from_state(state: &UserState) -> Self {
        if state.loading {
            Self {
                enabled: false,
                label: SUBMIT_BUSY_LABEL,
            }
        } else {
            Self {
                enabled: true,
                label: SUBMIT_LABEL,
            }
        }
    }
}

/// A freshly uploaded avatar wins over the stored one.
pub fn avatar_source(edits: &PendingFormEdits, state: &UserState) -> Option<String> {
    edits.avatar().map(str::to_string).or_else(|| {
        state
            .current_user
            .as_ref()
            .and_then(|user| user.avatar.clone())
    })
}

pub fn error_line(state: &UserState) -> String {
    state.error.clone().unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileView {
    pub signed_in: bool,
    pub avatar_source: Option<String>,
    pub caption: UploadCaption,
    pub username_default: String,
    pub email_default: String,
    pub submit: SubmitButton,
    pub error_line: String,
}

impl ProfileView {
    pub fn project(edits: &PendingFormEdits, upload: &UploadStatus, state: &UserState) -> Self {
        let user = state.current_user.as_ref();
        Self {
            signed_in: user.is_some(),
            avatar_source: avatar_source(edits, state),
            caption: UploadCaption::from_status(upload),
            username_default: user.map(|u| u.username.clone()).unwrap_or_default(),
            email_default: user.map(|u| u.email.clone()).unwrap_or_default(),
            submit: SubmitButton::from_state(state),
            error_line: error_line(state),
        }
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
