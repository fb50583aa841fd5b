use chrono::NaiveDate;

const KANJI_DELIMITERS: [char; 3] = ['年', '月', '日'];

/// Converts the date shapes found in uploaded schedules into `YYYY-MM-DD`.
///
/// Accepted inputs are `Y-M-D`, `Y/M/D`, `Y年M月D日` and the 8-digit form
/// `YYYYMMDD`. Two-character years are read as 20xx. Anything else is
/// returned unchanged, so applying this to an already canonical date is a
/// no-op.
pub fn canonicalize_date(input: &str) -> String {
    if input.len() == 8 && input.bytes().all(|b| b.is_ascii_digit()) {
        return format!("{}-{}-{}", &input[0..4], &input[4..6], &input[6..8]);
    }

    let fragments: Vec<&str> = if input.contains('-') {
        input.split('-').collect()
    } else if input.contains('/') {
        input.split('/').collect()
    } else if input.contains(KANJI_DELIMITERS) {
        input.split(KANJI_DELIMITERS).collect()
    } else {
        return input.to_string();
    };

    let fragments: Vec<&str> = fragments.into_iter().filter(|f| !f.is_empty()).collect();
    let [year, month, day] = fragments.as_slice() else {
        return input.to_string();
    };

    let year = if year.chars().count() <= 2 {
        format!("20{}", pad2(year))
    } else {
        year.to_string()
    };
    format!("{year}-{}-{}", pad2(month), pad2(day))
}

/// Parses a canonical `YYYY-MM-DD` string into a calendar date. Unpadded
/// or era-prefixed text is rejected even when chrono could read it.
pub fn parse_canonical_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if !is_canonical_date(input) {
        return None;
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()
}

/// True for ten bytes shaped `dddd-dd-dd`. Says nothing about the calendar.
pub fn is_canonical_date(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(idx, b)| idx == 4 || idx == 7 || b.is_ascii_digit())
}

fn pad2(fragment: &str) -> String {
    let width = fragment.chars().count();
    if width >= 2 {
        fragment.to_string()
    } else {
        format!("{}{fragment}", "0".repeat(2 - width))
    }
}
