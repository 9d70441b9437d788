use super::*;
use chrono::TimeZone;
use serde_json::json;

fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).single().expect("time")
}

fn submission(value: Value) -> Submission {
    Submission::parse(value.to_string().as_bytes()).expect("parse")
}

#[test]
fn header_titles_align_with_field_order() {
    assert_eq!(HEADER_TITLES.len(), ROW_WIDTH);
    assert_eq!(HEADER_TITLES[0], "Timestamp");
    assert_eq!(HEADER_TITLES[8], "Traffic Source");
    assert_eq!(FIELD_ORDER[7], SOURCE_FIELD);
    assert_eq!(header_cells().len(), 21);
}

#[test]
fn row_has_timestamp_then_fields_in_declared_order() {
    let sub = submission(json!({
        "specific_focus": "ops",
        "name": "Ada",
        "email": "ada@example.com",
        "unrelated": "ignored"
    }));
    let row = sub.to_row(fixed_time());

    assert_eq!(row.cells().len(), ROW_WIDTH);
    assert_eq!(row.cells()[0], "2024-03-05T14:30:00.000Z");
    assert_eq!(row.cells()[1], "Ada");
    assert_eq!(row.cells()[2], "ada@example.com");
    assert_eq!(row.cells()[20], "ops");
    assert!(!row.cells().iter().any(|cell| cell == "ignored"));
}

#[test]
fn missing_null_and_falsy_fields_become_empty_cells() {
    let sub = submission(json!({
        "name": null,
        "email": "",
        "employees": 0,
        "sales_team": false,
        "industry": "retail"
    }));
    let row = sub.to_row(fixed_time());

    assert_eq!(row.value("name"), Some(""));
    assert_eq!(row.value("email"), Some(""));
    assert_eq!(row.value("employees"), Some(""));
    assert_eq!(row.value("sales_team"), Some(""));
    assert_eq!(row.value("magic_wand"), Some(""));
    assert_eq!(row.value("industry"), Some("retail"));
}

#[test]
fn non_string_scalars_render_as_text() {
    let sub = submission(json!({ "employees": 12, "sales_team": true }));
    let row = sub.to_row(fixed_time());
    assert_eq!(row.value("employees"), Some("12"));
    assert_eq!(row.value("sales_team"), Some("true"));
}

#[test]
fn source_list_is_joined_with_comma_and_space() {
    let mut sub = submission(json!({ "source": ["ads", "referral"] }));
    sub.normalize_source();
    assert_eq!(sub.get("source"), Some(&json!("ads, referral")));
    assert_eq!(sub.to_row(fixed_time()).value("source"), Some("ads, referral"));
}

#[test]
fn scalar_source_is_left_untouched() {
    let mut sub = submission(json!({ "source": "linkedin" }));
    sub.normalize_source();
    assert_eq!(sub.get("source"), Some(&json!("linkedin")));
}

#[test]
fn empty_source_list_becomes_empty_cell() {
    let mut sub = submission(json!({ "source": [] }));
    sub.normalize_source();
    assert_eq!(sub.to_row(fixed_time()).value("source"), Some(""));
}

#[test]
fn other_list_fields_join_without_spaces() {
    let sub = submission(json!({ "which_ai_tools": ["chatgpt", "claude"] }));
    assert_eq!(
        sub.to_row(fixed_time()).value("which_ai_tools"),
        Some("chatgpt,claude")
    );
}

#[test]
fn rejects_malformed_and_non_object_bodies() {
    let err = Submission::parse(b"{not json").expect_err("malformed");
    assert_eq!(err.kind, crate::error::ErrorKind::Parse);

    let err = Submission::parse(b"[1, 2]").expect_err("array");
    assert_eq!(err.kind, crate::error::ErrorKind::Parse);
    assert!(err.message.contains("an array"));
}
