pub fn update_user_route(user_id: &str) -> String {
    format!("/api/user/update/{user_id}")
}

pub fn delete_user_route(user_id: &str) -> String {
    format!("/api/user/delete/{user_id}")
}

/// Failure envelope returned by the user endpoints.
///
/// Any other body is a success payload; only an explicit `success: false`
/// marks a rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendFailure {
    pub message: String,
}

impl BackendFailure {
    /// Returns the failure if `body` is one, i.e. carries `success: false`.
    pub fn from_body(body: &serde_json::Value) -> Option<Self> {
        match body.get("success") {
            Some(serde_json::Value::Bool(false)) => {
                let message = body
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Some(Self { message })
            }
            _ => None,
        }
    }
}
