//! Backend commands queued from UI to backend worker.

use profile_client::EditableField;
use std::path::PathBuf;

pub enum BackendCommand {
    FieldChanged { field: EditableField, value: String },
    UploadAvatar { path: PathBuf },
    FetchAvatar { url: String },
    Submit,
    DeleteAccount,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::FieldChanged { .. } => "field_changed",
            BackendCommand::UploadAvatar { .. } => "upload_avatar",
            BackendCommand::FetchAvatar { .. } => "fetch_avatar",
            BackendCommand::Submit => "submit",
            BackendCommand::DeleteAccount => "delete_account",
        }
    }
}
