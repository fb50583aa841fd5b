use crate::header::{DATE, PERIOD, ScheduleField, WEEKDAY};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Year {
    First,
    Second,
    Third,
}

impl Year {
    pub const ALL: [Year; 3] = [Year::First, Year::Second, Year::Third];

    pub fn from_number(value: u8) -> Option<Self> {
        match value {
            1 => Some(Year::First),
            2 => Some(Year::Second),
            3 => Some(Year::Third),
            _ => None,
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            Year::First => 1,
            Year::Second => 2,
            Year::Third => 3,
        }
    }

    fn index(&self) -> usize {
        usize::from(self.number() - 1)
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    A,
    B,
    N,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::A, Section::B, Section::N];

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'A' => Some(Section::A),
            'B' => Some(Section::B),
            'N' => Some(Section::N),
            _ => None,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Section::A => 'A',
            Section::B => 'B',
            Section::N => 'N',
        }
    }

    fn index(&self) -> usize {
        match self {
            Section::A => 0,
            Section::B => 1,
            Section::N => 2,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassFieldKind {
    Content,
    Teacher,
    PeriodCount,
}

impl ClassFieldKind {
    pub const ALL: [ClassFieldKind; 3] = [
        ClassFieldKind::Content,
        ClassFieldKind::Teacher,
        ClassFieldKind::PeriodCount,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            ClassFieldKind::Content => "の授業内容",
            ClassFieldKind::Teacher => "担当講師名",
            ClassFieldKind::PeriodCount => "コマ数",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.suffix() == suffix)
    }
}

/// Canonical column name for one cell of the class grid, e.g. `2年Bクラスコマ数`.
pub fn class_column(year: Year, section: Section, kind: ClassFieldKind) -> String {
    format!("{}年{}クラス{}", year.number(), section.letter(), kind.suffix())
}

/// Classification of the free-text `コマ数` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PeriodCount {
    Count(u32),
    Exam,
    MockExam,
    Practicum(Option<u32>),
    Other(String),
}

impl PeriodCount {
    /// Mock exams are matched before exams, so `模擬試験` is a mock exam.
    /// Any other text mentioning `試験` (e.g. `定期試験`) is an exam.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.contains("模試") || text.contains("模擬") {
            return PeriodCount::MockExam;
        }
        if text.contains("試験") {
            return PeriodCount::Exam;
        }
        if let Some(rest) = text.strip_prefix("実習") {
            return PeriodCount::Practicum(rest.trim().parse().ok());
        }
        text.parse()
            .map(PeriodCount::Count)
            .unwrap_or_else(|_| PeriodCount::Other(text.to_string()))
    }

    pub fn is_exam_like(&self) -> bool {
        matches!(self, PeriodCount::Exam | PeriodCount::MockExam)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassSlot {
    pub content: Option<String>,
    pub teacher: Option<String>,
    pub period_count: Option<String>,
}

impl ClassSlot {
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.teacher.is_none() && self.period_count.is_none()
    }

    /// A slot is shown in class views when it has content or a period count.
    pub fn is_scheduled(&self) -> bool {
        self.content.is_some() || self.period_count.is_some()
    }

    pub fn period_count_kind(&self) -> Option<PeriodCount> {
        self.period_count.as_deref().map(PeriodCount::parse)
    }

    pub fn is_exam_like(&self) -> bool {
        self.period_count_kind().is_some_and(|kind| kind.is_exam_like())
    }

    pub fn get(&self, kind: ClassFieldKind) -> Option<&str> {
        match kind {
            ClassFieldKind::Content => self.content.as_deref(),
            ClassFieldKind::Teacher => self.teacher.as_deref(),
            ClassFieldKind::PeriodCount => self.period_count.as_deref(),
        }
    }

    pub fn set(&mut self, kind: ClassFieldKind, value: Option<String>) {
        match kind {
            ClassFieldKind::Content => self.content = value,
            ClassFieldKind::Teacher => self.teacher = value,
            ClassFieldKind::PeriodCount => self.period_count = value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassGrid {
    slots: [[ClassSlot; 3]; 3],
}

impl ClassGrid {
    pub fn slot(&self, year: Year, section: Section) -> &ClassSlot {
        &self.slots[year.index()][section.index()]
    }

    pub fn slot_mut(&mut self, year: Year, section: Section) -> &mut ClassSlot {
        &mut self.slots[year.index()][section.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Year, Section, &ClassSlot)> {
        Year::ALL.into_iter().flat_map(move |year| {
            Section::ALL
                .into_iter()
                .map(move |section| (year, section, self.slot(year, section)))
        })
    }
}

/// One stored schedule line: a date, a period and the lesson of every class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleRow {
    pub date: String,
    pub weekday: String,
    pub period: String,
    pub classes: ClassGrid,
}

impl ScheduleRow {
    pub fn new(
        date: impl Into<String>,
        weekday: impl Into<String>,
        period: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            weekday: weekday.into(),
            period: period.into(),
            classes: ClassGrid::default(),
        }
    }

    pub fn slot(&self, year: Year, section: Section) -> &ClassSlot {
        self.classes.slot(year, section)
    }

    pub fn slot_mut(&mut self, year: Year, section: Section) -> &mut ClassSlot {
        self.classes.slot_mut(year, section)
    }

    /// Table column names in storage order.
    pub fn column_names() -> Vec<String> {
        let mut columns = vec![DATE.to_string(), WEEKDAY.to_string(), PERIOD.to_string()];
        for year in Year::ALL {
            for section in Section::ALL {
                for kind in ClassFieldKind::ALL {
                    columns.push(class_column(year, section, kind));
                }
            }
        }
        columns
    }

    pub fn to_columns(&self) -> Vec<(String, Option<String>)> {
        let mut columns = vec![
            (DATE.to_string(), Some(self.date.clone())),
            (WEEKDAY.to_string(), Some(self.weekday.clone())),
            (PERIOD.to_string(), Some(self.period.clone())),
        ];
        for (year, section, slot) in self.classes.iter() {
            for kind in ClassFieldKind::ALL {
                columns.push((
                    class_column(year, section, kind),
                    slot.get(kind).map(str::to_string),
                ));
            }
        }
        columns
    }

    /// Builds a row from canonical `(column, value)` pairs. Columns that are
    /// not part of the table are returned so the caller can report them.
    pub fn from_columns<'a, I>(columns: I) -> (Self, Vec<String>)
    where
        I: IntoIterator<Item = (&'a str, Option<String>)>,
    {
        let mut row = ScheduleRow::default();
        let mut unmapped = Vec::new();
        for (name, value) in columns {
            match ScheduleField::parse(name) {
                ScheduleField::Date => row.date = value.unwrap_or_default(),
                ScheduleField::Weekday => row.weekday = value.unwrap_or_default(),
                ScheduleField::Period => row.period = value.unwrap_or_default(),
                ScheduleField::Class {
                    year,
                    section,
                    kind,
                } => row.slot_mut(year, section).set(kind, value),
                ScheduleField::LegacyTime | ScheduleField::Unmapped(_) => {
                    unmapped.push(name.to_string())
                }
            }
        }
        (row, unmapped)
    }
}

impl Serialize for ScheduleRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let columns = self.to_columns();
        let mut map = serializer.serialize_map(Some(columns.len()))?;
        for (name, value) in &columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ScheduleRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Option<String>>::deserialize(deserializer)?;
        let (row, _) = ScheduleRow::from_columns(raw.iter().map(|(k, v)| (k.as_str(), v.clone())));
        Ok(row)
    }
}
