use super::*;

#[test]
fn maps_input_ids_to_fields() {
    assert_eq!(EditableField::from_id("email"), Ok(EditableField::Email));
    assert_eq!(
        EditableField::from_id("avatar"),
        Err(FormError::UnknownField("avatar".to_string()))
    );
}

#[test]
fn handle_change_is_a_shallow_merge() {
    let mut edits = PendingFormEdits::new();
    edits.handle_change(EditableField::Username, "alice");
    edits.handle_change(EditableField::Email, "alice@example.com");
    edits.handle_change(EditableField::Username, "alice2");

    assert_eq!(edits.get(EditableField::Username), Some("alice2"));
    assert_eq!(edits.get(EditableField::Email), Some("alice@example.com"));
    assert_eq!(edits.field_names(), vec!["email", "username"]);
}

#[test]
fn values_are_not_validated() {
    let mut edits = PendingFormEdits::new();
    edits.handle_change(EditableField::Email, "not-an-email");
    edits.handle_change(EditableField::Password, "1");
    assert_eq!(edits.get(EditableField::Email), Some("not-an-email"));
    assert_eq!(edits.get(EditableField::Password), Some("1"));
}

#[test]
fn empty_edits_serialize_to_empty_object() {
    let body = serde_json::to_value(PendingFormEdits::new()).expect("serialize");
    assert_eq!(body, serde_json::json!({}));
}

#[test]
fn avatar_keeps_other_fields_and_serializes_flat() {
    let mut edits = PendingFormEdits::new();
    edits.handle_change(EditableField::Username, "alice");
    let url = DownloadUrl::parse("https://storage.example.com/v0/b/bkt/o/1a.png?alt=media")
        .expect("url");
    edits.set_avatar(&url);

    assert_eq!(edits.avatar(), Some(url.as_str()));
    let body = serde_json::to_value(&edits).expect("serialize");
    assert_eq!(
        body,
        serde_json::json!({
            "avatar": "https://storage.example.com/v0/b/bkt/o/1a.png?alt=media",
            "username": "alice",
        })
    );
    assert_eq!(edits.field_names(), vec!["avatar", "username"]);
}
