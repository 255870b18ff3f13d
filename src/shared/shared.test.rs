use super::error::ApiError;
use super::models::{Priority, TicketChangeset};
use super::utils::parse_id;
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[test]
fn priority_parses_case_insensitively() {
    assert_eq!("LOW".parse::<Priority>().unwrap(), Priority::Low);
    assert_eq!("low".parse::<Priority>().unwrap(), Priority::Low);
    assert_eq!("Critical".parse::<Priority>().unwrap(), Priority::Critical);
    assert!("urgent".parse::<Priority>().is_err());
}

#[test]
fn priority_round_trips_through_display() {
    for p in [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ] {
        assert_eq!(p.to_string().parse::<Priority>().unwrap(), p);
    }
}

#[test]
fn priority_serializes_uppercase() {
    assert_eq!(
        serde_json::to_value(Priority::High).unwrap(),
        serde_json::json!("HIGH")
    );
    let p: Priority = serde_json::from_value(serde_json::json!("CRITICAL")).unwrap();
    assert_eq!(p, Priority::Critical);
}

#[test]
fn parse_id_accepts_numeric_only() {
    assert_eq!(parse_id("42").unwrap(), 42);
    assert!(matches!(parse_id("abc"), Err(ApiError::Validation(_))));
    assert!(matches!(parse_id(""), Err(ApiError::Validation(_))));
}

#[test]
fn changeset_knows_when_it_is_empty() {
    assert!(!TicketChangeset::default().has_changes());
    let changes = TicketChangeset {
        title: Some("new".to_string()),
        ..Default::default()
    };
    assert!(changes.has_changes());
}

#[test]
fn error_variants_map_to_documented_status_codes() {
    let cases = [
        (ApiError::Validation("v".into()), StatusCode::BAD_REQUEST),
        (ApiError::NotFound("n".into()), StatusCode::NOT_FOUND),
        (ApiError::FileMissing("f".into()), StatusCode::NOT_FOUND),
        (
            ApiError::Storage("s".into()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
        (
            ApiError::Database("d".into()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];
    for (err, expected) in cases {
        assert_eq!(err.into_response().status(), expected);
    }
}
