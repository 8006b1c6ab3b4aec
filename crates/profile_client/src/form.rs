use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::upload::DownloadUrl;

pub const AVATAR_FIELD: &str = "avatar";

/// Fields a user types into directly. `avatar` is deliberately absent: it
/// is only ever set from a finished upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditableField {
    Username,
    Email,
    Password,
}

impl EditableField {
    pub const ALL: [EditableField; 3] = [
        EditableField::Username,
        EditableField::Email,
        EditableField::Password,
    ];

    pub fn id(self) -> &'static str {
        match self {
            EditableField::Username => "username",
            EditableField::Email => "email",
            EditableField::Password => "password",
        }
    }

    pub fn from_id(id: &str) -> Result<Self, FormError> {
        Self::ALL
            .into_iter()
            .find(|field| field.id() == id)
            .ok_or_else(|| FormError::UnknownField(id.to_string()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("unknown profile field '{0}'")]
    UnknownField(String),
}

/// Draft changes to the signed-in user, sent verbatim as the update body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PendingFormEdits {
    fields: BTreeMap<String, String>,
}

impl PendingFormEdits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_change(&mut self, field: EditableField, value: impl Into<String>) {
        self.fields.insert(field.id().to_string(), value.into());
    }

    pub fn set_avatar(&mut self, url: &DownloadUrl) {
        self.fields
            .insert(AVATAR_FIELD.to_string(), url.as_str().to_string());
    }

    pub fn avatar(&self) -> Option<&str> {
        self.fields.get(AVATAR_FIELD).map(String::as_str)
    }

    pub fn get(&self, field: EditableField) -> Option<&str> {
        self.fields.get(field.id()).map(String::as_str)
    }

    /// Field names only; values may hold a password.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
