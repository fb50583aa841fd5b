use super::{ScheduleBackend, StoreError, StoreResult};
use crate::ScheduleRow;
use crate::header::{DATE, PERIOD};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, params, params_from_iter};

pub const TABLE_NAME: &str = "スケジュール";

pub struct SqliteScheduleStore {
    connection: Mutex<Connection>,
    columns: Vec<String>,
}

impl SqliteScheduleStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> StoreResult<Self> {
        let connection = Connection::open(path)?;
        Self::from_connection(connection)
    }

    pub fn in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> StoreResult<Self> {
        let columns = ScheduleRow::column_names();
        Self::initialize_schema(&connection, &columns)?;
        Ok(Self {
            connection: Mutex::new(connection),
            columns,
        })
    }

    fn initialize_schema(connection: &Connection, columns: &[String]) -> StoreResult<()> {
        let column_ddl = columns
            .iter()
            .map(|name| format!("{} TEXT", quote(name)))
            .collect::<Vec<_>>()
            .join(",\n                ");
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                {column_ddl},
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS schedule_date_idx ON {table} ({date});
            "#,
            table = quote(TABLE_NAME),
            date = quote(DATE),
        );
        connection.execute_batch(&ddl)?;
        Ok(())
    }

    fn select_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|name| quote(name))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "SELECT {columns} FROM {table} ORDER BY {date} ASC, {period} ASC, id ASC",
            table = quote(TABLE_NAME),
            date = quote(DATE),
            period = quote(PERIOD),
        )
    }

    fn insert_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|name| quote(name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=self.columns.len())
            .map(|idx| format!("?{idx}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {table} ({columns}) VALUES ({placeholders})",
            table = quote(TABLE_NAME),
        )
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

#[async_trait]
impl ScheduleBackend for SqliteScheduleStore {
    async fn delete_range(&self, min: &str, max: &str) -> StoreResult<usize> {
        let conn = self.connection.lock();
        let sql = format!(
            "DELETE FROM {table} WHERE {date} >= ?1 AND {date} <= ?2",
            table = quote(TABLE_NAME),
            date = quote(DATE),
        );
        let deleted = conn.execute(&sql, params![min, max])?;
        tracing::debug!(min, max, deleted, "deleted schedule range");
        Ok(deleted)
    }

    async fn insert_rows(&self, rows: &[ScheduleRow]) -> StoreResult<usize> {
        let mut conn = self.connection.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&self.insert_sql())?;
            for row in rows {
                let values: Vec<Option<String>> =
                    row.to_columns().into_iter().map(|(_, value)| value).collect();
                if values.len() != self.columns.len() {
                    return Err(StoreError::InvalidData(format!(
                        "row has {} values for {} columns",
                        values.len(),
                        self.columns.len()
                    )));
                }
                stmt.execute(params_from_iter(values.iter()))?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    async fn fetch_all(&self) -> StoreResult<Vec<ScheduleRow>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(&self.select_sql())?;
        let width = self.columns.len();
        let rows = stmt.query_map([], |row| {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                values.push(row.get::<_, Option<String>>(idx)?);
            }
            Ok(values)
        })?;

        let mut schedule = Vec::new();
        for values in rows {
            let values = values?;
            let (row, _) = ScheduleRow::from_columns(
                self.columns.iter().map(String::as_str).zip(values),
            );
            schedule.push(row);
        }
        Ok(schedule)
    }

    async fn available_dates(&self) -> StoreResult<Vec<String>> {
        let conn = self.connection.lock();
        let sql = format!(
            "SELECT DISTINCT {date} FROM {table} WHERE {date} IS NOT NULL ORDER BY {date} ASC",
            table = quote(TABLE_NAME),
            date = quote(DATE),
        );
        let mut stmt = conn.prepare(&sql)?;
        let dates = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut result = Vec::new();
        for date in dates {
            result.push(date?);
        }
        Ok(result)
    }
}
