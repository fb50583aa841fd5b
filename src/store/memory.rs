use super::{ScheduleBackend, StoreResult};
use crate::ScheduleRow;
use async_trait::async_trait;
use parking_lot::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryScheduleStore {
    rows: RwLock<Vec<ScheduleRow>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<ScheduleRow>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[async_trait]
impl ScheduleBackend for InMemoryScheduleStore {
    async fn delete_range(&self, min: &str, max: &str) -> StoreResult<usize> {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|row| !(row.date.as_str() >= min && row.date.as_str() <= max));
        Ok(before - rows.len())
    }

    async fn insert_rows(&self, rows: &[ScheduleRow]) -> StoreResult<usize> {
        self.rows.write().extend_from_slice(rows);
        Ok(rows.len())
    }

    async fn fetch_all(&self) -> StoreResult<Vec<ScheduleRow>> {
        let mut rows = self.rows.read().clone();
        rows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.period.cmp(&b.period)));
        Ok(rows)
    }

    async fn available_dates(&self) -> StoreResult<Vec<String>> {
        let mut dates: Vec<String> = self.rows.read().iter().map(|row| row.date.clone()).collect();
        dates.sort();
        dates.dedup();
        Ok(dates)
    }
}
