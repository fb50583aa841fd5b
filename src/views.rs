use crate::row::{ClassSlot, PeriodCount, Section, Year};
use crate::store::{ScheduleBackend, StoreResult};
use crate::ScheduleRow;
use serde::Serialize;
use std::cmp::Ordering;
use std::time::Duration;
use tracing::warn;

/// Teacher-name placeholders that do not name a person.
const NON_INSTRUCTOR_LABELS: [&str; 2] = ["試験", "自宅学習"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassFilter {
    pub year: Year,
    pub section: Section,
}

impl ClassFilter {
    pub fn new(year: Year, section: Section) -> Self {
        Self { year, section }
    }
}

/// One class's lesson on one date and period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassEntry {
    pub date: String,
    pub weekday: String,
    pub period: String,
    pub year: u8,
    pub class: char,
    pub content: Option<String>,
    pub teacher: Option<String>,
    pub period_count: Option<String>,
    pub period_kind: Option<PeriodCount>,
}

impl ClassEntry {
    fn from_slot(row: &ScheduleRow, year: Year, section: Section, slot: &ClassSlot) -> Self {
        Self {
            date: row.date.clone(),
            weekday: row.weekday.clone(),
            period: row.period.clone(),
            year: year.number(),
            class: section.letter(),
            content: slot.content.clone(),
            teacher: slot.teacher.clone(),
            period_count: slot.period_count.clone(),
            period_kind: slot.period_count_kind(),
        }
    }

    pub fn is_exam_like(&self) -> bool {
        self.period_kind.as_ref().is_some_and(PeriodCount::is_exam_like)
    }
}

/// Terminal columns taken by `text`. East Asian wide and fullwidth
/// characters take two columns, everything else one.
pub fn display_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}

fn char_width(c: char) -> usize {
    match u32::from(c) {
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA000..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x20000..=0x3FFFD => 2,
        _ => 1,
    }
}

fn by_date_then_period(a: &ScheduleRow, b: &ScheduleRow) -> Ordering {
    a.date.cmp(&b.date).then_with(|| a.period.cmp(&b.period))
}

fn sorted(rows: &[ScheduleRow]) -> Vec<&ScheduleRow> {
    let mut sorted: Vec<&ScheduleRow> = rows.iter().collect();
    sorted.sort_by(|a, b| by_date_then_period(a, b));
    sorted
}

/// Lessons of one class, in date and period order. Slots with neither
/// content nor a period count are left out; `exams_only` keeps exams and
/// mock exams.
pub fn class_schedule(rows: &[ScheduleRow], filter: ClassFilter, exams_only: bool) -> Vec<ClassEntry> {
    sorted(rows)
        .into_iter()
        .filter_map(|row| {
            let slot = row.slot(filter.year, filter.section);
            let keep = if exams_only {
                slot.is_exam_like()
            } else {
                slot.is_scheduled()
            };
            keep.then(|| ClassEntry::from_slot(row, filter.year, filter.section, slot))
        })
        .collect()
}

/// Every row for one date, ordered by period.
pub fn daily_schedule<'a>(rows: &'a [ScheduleRow], date: &str) -> Vec<&'a ScheduleRow> {
    let mut day: Vec<&ScheduleRow> = rows.iter().filter(|row| row.date == date).collect();
    day.sort_by(|a, b| a.period.cmp(&b.period));
    day
}

/// Distinct instructor names across the grid, sorted.
pub fn instructors(rows: &[ScheduleRow]) -> Vec<String> {
    let mut names: Vec<String> = rows
        .iter()
        .flat_map(|row| row.classes.iter())
        .filter_map(|(_, _, slot)| slot.teacher.as_deref())
        .filter(|name| !NON_INSTRUCTOR_LABELS.contains(name))
        .map(str::to_string)
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Every slot taught by `name`, one entry per class.
pub fn instructor_schedule(rows: &[ScheduleRow], name: &str) -> Vec<ClassEntry> {
    sorted(rows)
        .into_iter()
        .flat_map(|row| {
            row.classes
                .iter()
                .filter(|(_, _, slot)| slot.teacher.as_deref() == Some(name))
                .map(|(year, section, slot)| ClassEntry::from_slot(row, year, section, slot))
                .collect::<Vec<_>>()
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub first: String,
    pub last: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleListing {
    pub data: Vec<ScheduleRow>,
    pub metadata: ListingMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingMetadata {
    pub total_count: usize,
    pub date_range: Option<DateRange>,
}

impl ScheduleListing {
    /// Expects rows already in date order, as returned by `fetch_all`.
    pub fn new(data: Vec<ScheduleRow>) -> Self {
        let date_range = match (data.first(), data.last()) {
            (Some(first), Some(last)) => Some(DateRange {
                first: first.date.clone(),
                last: last.date.clone(),
            }),
            _ => None,
        };
        Self {
            metadata: ListingMetadata {
                total_count: data.len(),
                date_range,
            },
            data,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Loads every row, retrying failed reads with a linearly growing delay.
pub async fn fetch_with_retry(
    backend: &dyn ScheduleBackend,
    policy: &RetryPolicy,
) -> StoreResult<Vec<ScheduleRow>> {
    let mut attempt = 0;
    loop {
        match backend.fetch_all().await {
            Ok(rows) => return Ok(rows),
            Err(err) if attempt < policy.max_retries => {
                attempt += 1;
                warn!(attempt, error = %err, "schedule fetch failed, retrying");
                tokio::time::sleep(policy.base_delay * attempt).await;
            }
            Err(err) => return Err(err),
        }
    }
}
