use super::*;
use crate::tests::test_util;

fn attachment(id: i32, filename: &str) -> Attachment {
    Attachment {
        id,
        ticket_id: 1,
        filename: filename.to_string(),
        path: format!("/uploads/{}", filename),
        mimetype: "text/plain".to_string(),
        size: 10,
        created_at: Utc::now(),
    }
}

#[test]
fn parses_numeric_suffix() {
    assert_eq!(parse_ticket_number("Ticket-1"), Some(1));
    assert_eq!(parse_ticket_number("Ticket-41"), Some(41));
    assert_eq!(parse_ticket_number("Ticket-000123"), Some(123));
}

#[test]
fn rejects_foreign_formats() {
    assert_eq!(parse_ticket_number("TKT-000001"), None);
    assert_eq!(parse_ticket_number("Ticket-"), None);
    assert_eq!(parse_ticket_number("garbage"), None);
}

#[test]
fn numbering_starts_at_one() {
    assert_eq!(next_number_after(None), 1);
    // An unparseable stored value restarts the sequence rather than failing.
    assert_eq!(next_number_after(Some("legacy-format")), 1);
}

#[test]
fn numbering_increments_from_latest() {
    assert_eq!(next_number_after(Some("Ticket-1")), 2);
    assert_eq!(next_number_after(Some("Ticket-99")), 100);
}

#[test]
fn sequential_numbers_are_strictly_increasing_from_one() {
    test_util::setup();
    let mut latest: Option<String> = None;
    let mut seen = Vec::new();
    for _ in 0..20 {
        let n = next_number_after(latest.as_deref());
        seen.push(n);
        latest = Some(format_ticket_number(n));
    }
    assert_eq!(seen.first(), Some(&1));
    assert!(seen.windows(2).all(|w| w[1] == w[0] + 1));
}

#[test]
fn format_has_no_padding() {
    assert_eq!(format_ticket_number(1), "Ticket-1");
    assert_eq!(format_ticket_number(1000), "Ticket-1000");
}

#[test]
fn search_flags_matching_attachment_and_keeps_siblings() {
    let owned = vec![attachment(1, "invoice.pdf"), attachment(2, "photo.jpg")];
    let views = flag_attachments(owned, Some("invoice"));

    assert_eq!(views.len(), 2);
    assert_eq!(views[0].is_match, Some(true));
    assert_eq!(views[1].is_match, Some(false));
}

#[test]
fn search_matching_is_case_insensitive() {
    let owned = vec![attachment(1, "Invoice.PDF")];
    let views = flag_attachments(owned, Some("iNvOiCe"));
    assert_eq!(views[0].is_match, Some(true));
}

#[test]
fn no_search_leaves_attachments_unflagged() {
    let owned = vec![attachment(1, "invoice.pdf")];
    let views = flag_attachments(owned, None);
    assert_eq!(views[0].is_match, None);

    let json = serde_json::to_value(&views[0]).unwrap();
    assert!(json.get("isMatch").is_none());
}

#[test]
fn flagged_view_serializes_camel_case() {
    let owned = vec![attachment(7, "notes.txt")];
    let views = flag_attachments(owned, Some("notes"));
    let json = serde_json::to_value(&views[0]).unwrap();

    assert_eq!(json["isMatch"], serde_json::json!(true));
    assert_eq!(json["filename"], serde_json::json!("notes.txt"));
    assert_eq!(json["mimetype"], serde_json::json!("text/plain"));
}
