use crate::csv_input::{self, RawTable};
use crate::date::parse_canonical_date;
use crate::encoding::{self, CandidateEncoding, DecodeError};
use crate::header::{DATE, normalize_header};
use crate::sanitize::normalize_record;
use crate::store::{ScheduleBackend, StoreError};
use crate::validate::{self, MissingFieldError};
use crate::ScheduleRow;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug)]
pub enum IngestError {
    Decode(DecodeError),
    Csv(csv::Error),
    MissingField(MissingFieldError),
    /// A `日付` value that did not canonicalize to a calendar date.
    InvalidDate { row: usize, value: String },
    EmptyFile,
    DeleteRange(StoreError),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Decode(err) => write!(f, "{err}"),
            IngestError::Csv(err) => write!(f, "csv error: {err}"),
            IngestError::MissingField(err) => write!(f, "{err}"),
            IngestError::InvalidDate { row, value } => {
                write!(f, "row {row} has an unrecognized date: {value}")
            }
            IngestError::EmptyFile => write!(f, "file contains no data rows"),
            IngestError::DeleteRange(err) => {
                write!(f, "failed to delete existing rows before insert: {err}")
            }
        }
    }
}

impl std::error::Error for IngestError {}

impl From<DecodeError> for IngestError {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}

impl From<csv::Error> for IngestError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<MissingFieldError> for IngestError {
    fn from(value: MissingFieldError) -> Self {
        Self::MissingField(value)
    }
}

/// Validated rows ready for storage.
#[derive(Debug, Clone, Default)]
pub struct RowBatch {
    pub rows: Vec<ScheduleRow>,
    /// Canonical headers that have no table column and were dropped.
    pub unmapped_headers: Vec<String>,
    pub skipped_blank_rows: usize,
}

/// Result of decoding, tokenizing, normalizing and validating one file.
#[derive(Debug, Clone)]
pub struct ParsedUpload {
    pub encoding: CandidateEncoding,
    pub batch: RowBatch,
}

/// Header and sample view of a file, without validation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvAnalysis {
    pub encoding: CandidateEncoding,
    pub headers: Vec<String>,
    pub row_count: usize,
    pub sample_data: Vec<serde_json::Map<String, serde_json::Value>>,
}

const SAMPLE_ROWS: usize = 3;

pub fn analyze_bytes(bytes: &[u8]) -> Result<CsvAnalysis, IngestError> {
    let decoded = encoding::detect_and_decode(bytes)?;
    let table = csv_input::parse_table(&decoded.text)?;
    let headers: Vec<String> = table.headers.iter().map(|h| normalize_header(h)).collect();
    let sample_data = table
        .records
        .iter()
        .take(SAMPLE_ROWS)
        .map(|record| {
            normalize_record(record.iter())
                .iter()
                .map(|(name, value)| {
                    let value = value
                        .map(|v| serde_json::Value::String(v.to_string()))
                        .unwrap_or(serde_json::Value::Null);
                    (name.to_string(), value)
                })
                .collect()
        })
        .collect();
    Ok(CsvAnalysis {
        encoding: decoded.encoding,
        headers,
        row_count: table.records.len(),
        sample_data,
    })
}

pub fn parse_upload(bytes: &[u8]) -> Result<ParsedUpload, IngestError> {
    let decoded = encoding::detect_and_decode(bytes)?;
    info!(
        encoding = %decoded.encoding,
        corruption = decoded.corruption,
        "decoded upload"
    );
    let table = csv_input::parse_table(&decoded.text)?;
    let batch = rows_from_table(&table)?;
    Ok(ParsedUpload {
        encoding: decoded.encoding,
        batch,
    })
}

fn rows_from_table(table: &RawTable) -> Result<RowBatch, IngestError> {
    if table.records.is_empty() {
        return Err(IngestError::EmptyFile);
    }
    let canonical: Vec<String> = table.headers.iter().map(|h| normalize_header(h)).collect();
    validate::validate_headers(canonical.iter().map(String::as_str))?;

    let records = table.records.iter().map(|record| (record.line, normalize_record(record.iter())));
    rows_from_records(records)
}

/// Validates normalized records and maps them onto schedule rows. Blank
/// records are skipped; `row` numbers in errors are the caller's numbering.
/// A date that is not `YYYY-MM-DD` after canonicalization rejects the
/// batch, since it would corrupt the replaced range.
pub fn rows_from_records<I>(records: I) -> Result<RowBatch, IngestError>
where
    I: IntoIterator<Item = (usize, crate::sanitize::NormalizedRecord)>,
{
    let mut rows = Vec::new();
    let mut unmapped = BTreeSet::new();
    let mut skipped_blank_rows = 0;
    for (row_number, record) in records {
        if record.is_blank() {
            skipped_blank_rows += 1;
            continue;
        }
        let record = validate::validate_record(record, row_number)?;
        let date = record.get(DATE).unwrap_or_default();
        if parse_canonical_date(date).is_none() {
            return Err(IngestError::InvalidDate {
                row: row_number,
                value: date.to_string(),
            });
        }
        let (row, dropped) = ScheduleRow::from_columns(
            record
                .iter()
                .map(|(name, value)| (name, value.map(str::to_string))),
        );
        unmapped.extend(dropped);
        rows.push(row);
    }
    if skipped_blank_rows > 0 {
        warn!(skipped_blank_rows, "skipped blank rows");
    }
    Ok(RowBatch {
        rows,
        unmapped_headers: unmapped.into_iter().collect(),
        skipped_blank_rows,
    })
}

/// Smallest and largest calendar date in the batch. Dates that do not
/// parse are left out of the span.
pub fn date_span(rows: &[ScheduleRow]) -> Option<(String, String)> {
    let mut dates = rows.iter().map(|row| row.date.as_str()).filter(|date| {
        let valid = parse_canonical_date(date).is_some();
        if !valid {
            warn!(date = %date, "date left out of the replaced range");
        }
        valid
    });
    let first = dates.next()?;
    let (min, max) = dates.fold((first, first), |(min, max), date| {
        (min.min(date), max.max(date))
    });
    Some((min.to_string(), max.to_string()))
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub chunk_size: usize,
    pub chunk_delay: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            chunk_delay: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStage {
    Read,
    Decoded,
    Parsed,
    Validated,
    Deleted,
    Inserting,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UploadProgress {
    pub percent: u8,
    pub stage: UploadStage,
}

type ProgressFn = dyn Fn(UploadProgress) + Send + Sync;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChunkOutcome {
    Inserted { index: usize, rows: usize },
    Failed { index: usize, rows: usize, error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Success,
    PartialSuccess,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub total_rows: usize,
    pub deleted_count: usize,
    pub inserted_count: usize,
    pub failed_chunk_count: usize,
    pub chunks: Vec<ChunkOutcome>,
}

impl IngestReport {
    pub fn status(&self) -> IngestStatus {
        match (self.failed_chunk_count, self.inserted_count) {
            (0, _) => IngestStatus::Success,
            (_, 0) => IngestStatus::Failed,
            _ => IngestStatus::PartialSuccess,
        }
    }

    pub fn summary(&self) -> String {
        match self.status() {
            IngestStatus::Success => format!("uploaded {} rows", self.inserted_count),
            IngestStatus::PartialSuccess => format!(
                "uploaded {} of {} rows; {} chunk(s) failed",
                self.inserted_count, self.total_rows, self.failed_chunk_count
            ),
            IngestStatus::Failed => "upload failed; no rows were inserted".to_string(),
        }
    }
}

/// Replaces the stored date range covered by an upload.
///
/// The delete runs first and aborts the upload if it fails. Inserts then
/// run chunk by chunk; a failed chunk is recorded and the next one is still
/// attempted. Nothing is rolled back, so a partial upload leaves the range
/// with fewer rows than the file.
pub struct Ingestor {
    backend: Arc<dyn ScheduleBackend>,
    config: IngestConfig,
    progress: Option<Box<ProgressFn>>,
}

impl Ingestor {
    pub fn new(backend: Arc<dyn ScheduleBackend>, config: IngestConfig) -> Self {
        Self {
            backend,
            config,
            progress: None,
        }
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(UploadProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    fn report_progress(&self, percent: u8, stage: UploadStage) {
        if let Some(callback) = &self.progress {
            callback(UploadProgress { percent, stage });
        }
    }

    /// Decodes, validates and stores a raw upload.
    pub async fn import_bytes(&self, bytes: &[u8]) -> Result<IngestReport, IngestError> {
        self.report_progress(20, UploadStage::Read);
        let decoded = encoding::detect_and_decode(bytes)?;
        self.report_progress(30, UploadStage::Decoded);
        let table = csv_input::parse_table(&decoded.text)?;
        self.report_progress(50, UploadStage::Parsed);
        let batch = rows_from_table(&table)?;
        if !batch.unmapped_headers.is_empty() {
            info!(headers = ?batch.unmapped_headers, "dropping columns without a table column");
        }
        self.report_progress(60, UploadStage::Validated);
        self.replace_range(batch.rows).await
    }

    pub async fn replace_range(&self, rows: Vec<ScheduleRow>) -> Result<IngestReport, IngestError> {
        let total_rows = rows.len();
        let mut report = IngestReport {
            total_rows,
            deleted_count: 0,
            inserted_count: 0,
            failed_chunk_count: 0,
            chunks: Vec::new(),
        };

        if rows.is_empty() {
            self.report_progress(100, UploadStage::Done);
            return Ok(report);
        }

        if let Some((min, max)) = date_span(&rows) {
            report.deleted_count = self
                .backend
                .delete_range(&min, &max)
                .await
                .map_err(IngestError::DeleteRange)?;
            info!(%min, %max, deleted = report.deleted_count, "cleared date range");
        }
        self.report_progress(70, UploadStage::Deleted);

        let chunk_size = self.config.chunk_size.max(1);
        let chunk_count = total_rows.div_ceil(chunk_size);
        for (index, chunk) in rows.chunks(chunk_size).enumerate() {
            match self.backend.insert_rows(chunk).await {
                Ok(inserted) => {
                    report.inserted_count += inserted;
                    report.chunks.push(ChunkOutcome::Inserted {
                        index,
                        rows: inserted,
                    });
                }
                Err(err) => {
                    warn!(chunk = index, rows = chunk.len(), error = %err, "chunk insert failed");
                    report.failed_chunk_count += 1;
                    report.chunks.push(ChunkOutcome::Failed {
                        index,
                        rows: chunk.len(),
                        error: err.to_string(),
                    });
                }
            }

            let offset = index * chunk_size;
            let percent = 70 + (offset * 30 / total_rows) as u8;
            self.report_progress(percent, UploadStage::Inserting);

            if index + 1 < chunk_count && !self.config.chunk_delay.is_zero() {
                tokio::time::sleep(self.config.chunk_delay).await;
            }
        }

        self.report_progress(100, UploadStage::Done);
        info!(
            total = total_rows,
            inserted = report.inserted_count,
            failed_chunks = report.failed_chunk_count,
            "upload finished"
        );
        Ok(report)
    }
}
