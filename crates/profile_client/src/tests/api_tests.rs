use super::*;
use crate::form::EditableField;
use axum::{
    extract::{Path, State},
    routing::{delete, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone)]
struct BackendState {
    reply: Value,
    received: Arc<Mutex<Vec<(String, String, Value)>>>,
}

async fn handle_update(
    State(state): State<BackendState>,
    Path(user_id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state
        .received
        .lock()
        .await
        .push(("update".to_string(), user_id, body));
    Json(state.reply.clone())
}

async fn handle_delete(State(state): State<BackendState>, Path(user_id): Path<String>) -> Json<Value> {
    state
        .received
        .lock()
        .await
        .push(("delete".to_string(), user_id, Value::Null));
    Json(state.reply.clone())
}

async fn spawn_backend(reply: Value) -> (String, BackendState) {
    let state = BackendState {
        reply,
        received: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/api/user/update/:id", post(handle_update))
        .route("/api/user/delete/:id", delete(handle_delete))
        .with_state(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), state)
}

#[test]
fn explicit_false_success_is_a_rejection() {
    let result: Result<Value, RequestFailure> =
        interpret_response(r#"{"success":false,"statusCode":409,"message":"Email taken"}"#);
    assert_eq!(result, Err(RequestFailure::Rejected("Email taken".to_string())));
}

#[test]
fn rejection_without_message_uses_empty_string() {
    let result: Result<Value, RequestFailure> = interpret_response(r#"{"success":false}"#);
    assert_eq!(result, Err(RequestFailure::Rejected(String::new())));
}

#[test]
fn truthy_or_missing_success_is_not_a_rejection() {
    let result: Result<Value, RequestFailure> =
        interpret_response(r#"{"success":"false","ok":1}"#);
    assert!(result.is_ok());
    let result: Result<Value, RequestFailure> = interpret_response(r#"{"deleted":true}"#);
    assert!(result.is_ok());
}

#[test]
fn malformed_json_is_a_transport_failure() {
    let result: Result<Value, RequestFailure> = interpret_response("<html>502</html>");
    assert!(matches!(result, Err(RequestFailure::Transport(_))));
}

#[test]
fn partial_success_body_still_decodes_as_user() {
    let user: UserRecord =
        interpret_response(r#"{"success":true,"message":"ok"}"#).expect("success body");
    assert_eq!(user.id.0, "");
    assert_eq!(user.username, "");
    assert_eq!(user.avatar, None);
    assert_eq!(user.extra.get("success"), Some(&json!(true)));
    assert_eq!(user.extra.get("message"), Some(&json!("ok")));
}

#[test]
fn request_failure_maps_to_error_code() {
    let err = ApiError::from(&RequestFailure::Transport("down".to_string()));
    assert_eq!(err.code, ErrorCode::Transport);
    assert_eq!(err.message, "down");
}

#[tokio::test]
async fn update_posts_edits_and_parses_user() {
    let (base, state) = spawn_backend(json!({
        "_id": "u1",
        "username": "alice2",
        "email": "alice@example.com",
        "avatar": "https://cdn/x.png",
        "createdAt": "2024-01-01T00:00:00Z",
    }))
    .await;
    let api = ProfileApi::new(Client::new(), format!("{base}/"));
    let mut edits = PendingFormEdits::new();
    edits.handle_change(EditableField::Username, "alice2");

    let user = api
        .update_user(&UserId::from("u1"), &edits)
        .await
        .expect("update");

    assert_eq!(user.username, "alice2");
    assert_eq!(user.extra.get("createdAt"), Some(&json!("2024-01-01T00:00:00Z")));
    let received = state.received.lock().await;
    assert_eq!(
        received.as_slice(),
        [(
            "update".to_string(),
            "u1".to_string(),
            json!({"username": "alice2"})
        )]
    );
}

#[tokio::test]
async fn update_with_empty_edits_sends_empty_object() {
    let (base, state) = spawn_backend(json!({"success": false, "message": "nothing"})).await;
    let api = ProfileApi::new(Client::new(), base);

    let err = api
        .update_user(&UserId::from("u1"), &PendingFormEdits::new())
        .await
        .expect_err("rejected");

    assert_eq!(err, RequestFailure::Rejected("nothing".to_string()));
    assert_eq!(state.received.lock().await[0].2, json!({}));
}

#[tokio::test]
async fn delete_sends_no_body_and_returns_payload() {
    let (base, state) = spawn_backend(json!("User has been deleted!")).await;
    let api = ProfileApi::new(Client::new(), base);

    let payload = api.delete_user(&UserId::from("u9")).await.expect("delete");

    assert_eq!(payload, json!("User has been deleted!"));
    let received = state.received.lock().await;
    assert_eq!(received[0].0, "delete");
    assert_eq!(received[0].1, "u9");
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let api = ProfileApi::new(Client::new(), format!("http://{addr}"));

    let err = api
        .delete_user(&UserId::from("u1"))
        .await
        .expect_err("unreachable");
    assert!(err.is_transport());
}

#[test]
fn client_builder_honours_optional_timeout() {
    let settings = Settings {
        request_timeout_secs: Some(5),
        ..Settings::default()
    };
    build_http_client(&settings).expect("client with timeout");
    build_http_client(&Settings::default()).expect("client without timeout");
}
