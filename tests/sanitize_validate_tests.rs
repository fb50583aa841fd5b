use curriculum_tool::{
    MissingFieldError, NormalizedRecord, normalize_record, sanitize_value, validate_headers,
    validate_record,
};

#[test]
fn values_are_trimmed() {
    assert_eq!(
        sanitize_value("  解剖学 ", "1年Aクラスの授業内容"),
        Some("解剖学".to_string())
    );
}

#[test]
fn empty_and_corrupted_values_become_none() {
    assert_eq!(sanitize_value("", "曜日"), None);
    assert_eq!(sanitize_value("   ", "曜日"), None);
    assert_eq!(sanitize_value("解\u{FFFD}剖", "1年Aクラスの授業内容"), None);
    assert_eq!(sanitize_value("bell\u{0007}", "1年Aクラスの授業内容"), None);
}

#[test]
fn date_field_is_canonicalized() {
    assert_eq!(sanitize_value("2025/9/3", "日付"), Some("2025-09-03".to_string()));
    assert_eq!(sanitize_value("2025/9/3", "曜日"), Some("2025/9/3".to_string()));
}

#[test]
fn records_are_keyed_by_canonical_names() {
    let record = normalize_record([
        ("譌･莉\u{FFFD}", "2025/9/30"),
        ("譖懈律", "火"),
        ("譎る剞", " 1 "),
        ("1年Aクラス担当講師名", ""),
    ]);
    assert_eq!(record.get("日付"), Some("2025-09-30"));
    assert_eq!(record.get("曜日"), Some("火"));
    assert_eq!(record.get("時限"), Some("1"));
    assert!(record.has_field("1年Aクラス担当講師名"));
    assert_eq!(record.get("1年Aクラス担当講師名"), None);
}

#[test]
fn later_empty_duplicate_does_not_erase_a_value() {
    let record = normalize_record([("日付", "2025-09-30"), ("日付(予備)", "")]);
    assert_eq!(record.get("日付"), Some("2025-09-30"));
    assert_eq!(record.field_names().count(), 1);
}

#[test]
fn header_set_accepts_legacy_time_column() {
    assert!(validate_headers(["日付", "曜日", "時間"]).is_ok());
    assert!(validate_headers(["日付", "曜日", "時限", "1年Aクラスの授業内容"]).is_ok());
}

#[test]
fn header_set_reports_missing_columns() {
    let err = validate_headers(["曜日", "時限"]).expect_err("date column missing");
    assert_eq!(
        err,
        MissingFieldError {
            row: None,
            fields: vec!["日付".to_string()],
        }
    );
    assert_eq!(
        err.to_string(),
        "required fields are missing from the file: 日付"
    );
}

#[test]
fn legacy_time_value_fills_empty_period() {
    let record = normalize_record([("日付", "2025-09-30"), ("曜日", "火"), ("時間", "2")]);
    let record = validate_record(record, 1).expect("valid with legacy time");
    assert_eq!(record.get("時限"), Some("2"));
}

#[test]
fn explicit_period_wins_over_legacy_time() {
    let record = normalize_record([
        ("日付", "2025-09-30"),
        ("曜日", "火"),
        ("時限", "1"),
        ("時間", "2"),
    ]);
    let record = validate_record(record, 1).expect("valid");
    assert_eq!(record.get("時限"), Some("1"));
}

#[test]
fn missing_values_name_the_row_and_fields() {
    let record = normalize_record([("日付", ""), ("曜日", ""), ("時限", "3")]);
    let err = validate_record(record, 5).expect_err("missing values");
    assert_eq!(err.row, Some(5));
    assert_eq!(err.fields, vec!["日付".to_string(), "曜日".to_string()]);
    assert!(err.to_string().starts_with("row 5 is missing required fields"));
}

#[test]
fn blank_record_is_detected() {
    let record = normalize_record([("日付", " "), ("曜日", "")]);
    assert!(record.is_blank());
    assert!(NormalizedRecord::new().is_blank());
}
