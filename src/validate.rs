use crate::header::{DATE, LEGACY_TIME, PERIOD, WEEKDAY};
use crate::sanitize::NormalizedRecord;
use std::fmt;

pub const REQUIRED_FIELDS: [&str; 3] = [DATE, PERIOD, WEEKDAY];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFieldError {
    /// 1-based data row, or `None` when the column itself is absent.
    pub row: Option<usize>,
    pub fields: Vec<String>,
}

impl fmt::Display for MissingFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.fields.join(", ");
        match self.row {
            Some(row) => write!(f, "row {row} is missing required fields: {fields}"),
            None => write!(f, "required fields are missing from the file: {fields}"),
        }
    }
}

impl std::error::Error for MissingFieldError {}

/// Checks that the normalized header set carries every required column.
/// A legacy `時間` column stands in for a missing `時限`.
pub fn validate_headers<'a, I>(fields: I) -> Result<(), MissingFieldError>
where
    I: IntoIterator<Item = &'a str>,
{
    let fields: Vec<&str> = fields.into_iter().collect();
    let has_legacy_time = fields.contains(&LEGACY_TIME);
    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|required| !fields.contains(*required))
        .filter(|required| !(**required == PERIOD && has_legacy_time))
        .map(|required| required.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(MissingFieldError { row: None, fields: missing })
    }
}

/// Checks one record for required values, copying `時間` into an empty
/// `時限` first.
pub fn validate_record(
    mut record: NormalizedRecord,
    row: usize,
) -> Result<NormalizedRecord, MissingFieldError> {
    if record.get(PERIOD).is_none() {
        if let Some(time) = record.get(LEGACY_TIME).map(str::to_string) {
            record.insert(PERIOD, Some(time));
        }
    }

    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|required| record.get(required).is_none())
        .map(|required| required.to_string())
        .collect();
    if missing.is_empty() {
        Ok(record)
    } else {
        Err(MissingFieldError {
            row: Some(row),
            fields: missing,
        })
    }
}
