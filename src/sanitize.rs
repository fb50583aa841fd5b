use crate::date::canonicalize_date;
use crate::encoding::contains_corruption;
use crate::header::{DATE, normalize_header};

/// Cleans one cell. Empty, blank and mojibake-damaged cells become `None`;
/// the date column is canonicalized to `YYYY-MM-DD`.
pub fn sanitize_value(raw: &str, field: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || contains_corruption(trimmed) {
        return None;
    }
    if field == DATE {
        return Some(canonicalize_date(trimmed));
    }
    Some(trimmed.to_string())
}

/// A record after header normalization and value sanitization, keyed by
/// canonical field name in source column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRecord {
    fields: Vec<(String, Option<String>)>,
}

impl NormalizedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a field. When two source columns normalize to
    /// the same name the later non-empty value is kept.
    pub fn insert(&mut self, field: impl Into<String>, value: Option<String>) {
        let field = field.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => {
                if value.is_some() || existing.is_none() {
                    *existing = value;
                }
            }
            None => self.fields.push((field, value)),
        }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|(name, _)| name == field)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, value)| value.is_none())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }
}

/// Normalizes every header of a raw record and sanitizes its values.
pub fn normalize_record<'a, I>(raw: I) -> NormalizedRecord
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut record = NormalizedRecord::new();
    for (header, value) in raw {
        let field = normalize_header(header);
        let value = sanitize_value(value, &field);
        record.insert(field, value);
    }
    record
}
