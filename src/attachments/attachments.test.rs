use super::*;

#[test]
fn content_disposition_carries_stored_filename() {
    assert_eq!(
        content_disposition("a.txt"),
        "attachment; filename=\"a.txt\""
    );
}

#[test]
fn upload_response_serializes_camel_case() {
    let response = UploadResponse {
        filename: "a.txt".to_string(),
        original_filename: "a.txt".to_string(),
        mimetype: "text/plain".to_string(),
        size: 10,
        path: "/uploads/123-abc-a.txt".to_string(),
    };
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["filename"], serde_json::json!("a.txt"));
    assert_eq!(json["originalFilename"], serde_json::json!("a.txt"));
    assert_eq!(json["mimetype"], serde_json::json!("text/plain"));
    assert_eq!(json["size"], serde_json::json!(10));
    assert_eq!(json["path"], serde_json::json!("/uploads/123-abc-a.txt"));
}

#[test]
fn register_request_accepts_partial_metadata() {
    let req: RegisterAttachmentRequest =
        serde_json::from_str(r#"{"filename":"a.txt","path":"/uploads/x-a.txt"}"#).unwrap();
    assert_eq!(req.filename.as_deref(), Some("a.txt"));
    assert_eq!(req.mimetype, None);
    assert_eq!(req.size, None);
}
