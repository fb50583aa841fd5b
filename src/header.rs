use crate::row::{ClassFieldKind, Section, Year};
use once_cell::sync::Lazy;
use regex::Regex;

pub const DATE: &str = "日付";
pub const WEEKDAY: &str = "曜日";
pub const PERIOD: &str = "時限";
pub const LEGACY_TIME: &str = "時間";
pub const MOCK_EXAM: &str = "模擬試験";

/// Raw header spellings, including Shift-JIS bytes that were mis-decoded as
/// UTF-8 before being saved back into the file. Order matters for the
/// substring pass.
const HEADER_ALIASES: [(&str, &str); 11] = [
    ("\u{FFFD}ｿ譌･莉\u{FFFD}", DATE),
    ("譌･莉\u{FFFD}", DATE),
    ("日付", DATE),
    ("譖懈律", WEEKDAY),
    ("曜日", WEEKDAY),
    ("譎る俣", LEGACY_TIME),
    ("時間", LEGACY_TIME),
    ("譎る剞", PERIOD),
    ("時限", PERIOD),
    ("時", PERIOD),
    ("限", PERIOD),
];

const SUFFIX_ALIASES: [(&str, &str); 6] = [
    ("の授業内容", "の授業内容"),
    ("縺ｮ謗域･ｭ蜀\u{FFFD}ｮｹ", "の授業内容"),
    ("担当講師名", "担当講師名"),
    ("諡\u{FFFD}ｽ楢ｬ帛ｸｫ蜷\u{FFFD}", "担当講師名"),
    ("コマ数", "コマ数"),
    ("繧ｳ繝樊焚", "コマ数"),
];

const MOJIBAKE_MOCK_EXAM: &str = "讓｡謫ｬ隧ｦ鬨\u{FFFD}";

static CLASS_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)(?:年|蟷ｴ)([A-Z])(?:クラス|繧ｯ繝ｩ繧ｹ)(.+)").expect("valid class header regex")
});

/// Maps a raw column header to its canonical spelling. Unknown headers are
/// returned unchanged.
pub fn normalize_header(raw: &str) -> String {
    if let Some((_, canonical)) = HEADER_ALIASES.iter().find(|(alias, _)| *alias == raw) {
        return canonical.to_string();
    }

    if let Some((_, canonical)) = HEADER_ALIASES.iter().find(|(alias, _)| raw.contains(alias)) {
        return canonical.to_string();
    }

    if let Some(caps) = CLASS_HEADER.captures(raw) {
        let year = &caps[1];
        let class = &caps[2];
        let suffix = &caps[3];
        let suffix = SUFFIX_ALIASES
            .iter()
            .find(|(alias, _)| suffix.contains(alias))
            .map(|(_, canonical)| *canonical)
            .unwrap_or(suffix);
        return format!("{year}年{class}クラス{suffix}");
    }

    if raw.contains(MOJIBAKE_MOCK_EXAM) {
        return MOCK_EXAM.to_string();
    }

    raw.to_string()
}

/// The role a canonical header plays in a schedule row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleField {
    Date,
    Weekday,
    Period,
    LegacyTime,
    Class {
        year: Year,
        section: Section,
        kind: ClassFieldKind,
    },
    Unmapped(String),
}

impl ScheduleField {
    pub fn parse(canonical: &str) -> Self {
        match canonical {
            DATE => return ScheduleField::Date,
            WEEKDAY => return ScheduleField::Weekday,
            PERIOD => return ScheduleField::Period,
            LEGACY_TIME => return ScheduleField::LegacyTime,
            _ => {}
        }
        Self::parse_class(canonical).unwrap_or_else(|| ScheduleField::Unmapped(canonical.into()))
    }

    fn parse_class(canonical: &str) -> Option<Self> {
        let (year, rest) = canonical.split_once('年')?;
        let year = Year::from_number(year.parse().ok()?)?;
        let mut chars = rest.chars();
        let section = Section::from_letter(chars.next()?)?;
        let suffix = chars.as_str().strip_prefix("クラス")?;
        let kind = ClassFieldKind::from_suffix(suffix)?;
        Some(ScheduleField::Class {
            year,
            section,
            kind,
        })
    }
}
