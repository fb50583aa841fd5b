use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use curriculum_tool::ingest::{ChunkOutcome, date_span};
use curriculum_tool::store::StoreResult;
use curriculum_tool::{
    InMemoryScheduleStore, IngestConfig, IngestError, IngestStatus, Ingestor, ScheduleBackend,
    ScheduleRow, Section, StoreError, Year, analyze_bytes, parse_upload,
};

/// Wraps the in-memory store and fails selected calls.
#[derive(Default)]
struct FaultyBackend {
    inner: InMemoryScheduleStore,
    fail_delete: bool,
    fail_insert_call: Option<usize>,
    insert_calls: AtomicUsize,
}

#[async_trait]
impl ScheduleBackend for FaultyBackend {
    async fn delete_range(&self, min: &str, max: &str) -> StoreResult<usize> {
        if self.fail_delete {
            return Err(StoreError::Backend("delete rejected".into()));
        }
        self.inner.delete_range(min, max).await
    }

    async fn insert_rows(&self, rows: &[ScheduleRow]) -> StoreResult<usize> {
        let call = self.insert_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_insert_call == Some(call) {
            return Err(StoreError::Backend("insert rejected".into()));
        }
        self.inner.insert_rows(rows).await
    }

    async fn fetch_all(&self) -> StoreResult<Vec<ScheduleRow>> {
        self.inner.fetch_all().await
    }

    async fn available_dates(&self) -> StoreResult<Vec<String>> {
        self.inner.available_dates().await
    }
}

fn fast_config() -> IngestConfig {
    IngestConfig {
        chunk_size: 10,
        chunk_delay: Duration::ZERO,
    }
}

fn rows_for_days(count: usize) -> Vec<ScheduleRow> {
    (0..count)
        .map(|idx| ScheduleRow::new(format!("2025-10-{:02}", idx + 1), "月", "1"))
        .collect()
}

const UPLOAD: &str = "日付,曜日,時限,1年Aクラスの授業内容,1年Aクラス担当講師名,1年Aクラスコマ数,備考\n\
2025/9/30,火,1,解剖学,山田,2,\n\
2025/10/1,水,2,生理学,佐藤,試験,持ち物あり\n";

#[tokio::test]
async fn failed_chunk_is_recorded_and_later_chunks_still_run() {
    let backend = Arc::new(FaultyBackend {
        fail_insert_call: Some(3),
        ..Default::default()
    });
    let ingestor = Ingestor::new(backend.clone(), fast_config());

    let report = ingestor
        .replace_range(rows_for_days(25))
        .await
        .expect("delete succeeds");

    assert_eq!(report.total_rows, 25);
    assert_eq!(report.inserted_count, 20);
    assert_eq!(report.failed_chunk_count, 1);
    assert_eq!(report.status(), IngestStatus::PartialSuccess);
    assert!(matches!(report.chunks[2], ChunkOutcome::Failed { index: 2, rows: 5, .. }));
    assert_eq!(backend.inner.len(), 20);
    assert_eq!(backend.insert_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn inserted_count_sums_only_successful_chunks() {
    let backend = Arc::new(FaultyBackend {
        fail_insert_call: Some(2),
        ..Default::default()
    });
    let report = Ingestor::new(backend, fast_config())
        .replace_range(rows_for_days(25))
        .await
        .expect("delete succeeds");
    assert_eq!(report.inserted_count, 15);
    assert_eq!(report.status(), IngestStatus::PartialSuccess);
    assert_eq!(
        report.summary(),
        "uploaded 15 of 25 rows; 1 chunk(s) failed"
    );
}

#[tokio::test]
async fn failed_delete_aborts_before_any_insert() {
    let backend = Arc::new(FaultyBackend {
        fail_delete: true,
        ..Default::default()
    });
    let ingestor = Ingestor::new(backend.clone(), fast_config());

    let err = ingestor
        .replace_range(rows_for_days(3))
        .await
        .expect_err("delete fails");

    assert!(matches!(err, IngestError::DeleteRange(_)));
    assert_eq!(backend.insert_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn every_chunk_failing_reports_failure() {
    let backend = Arc::new(FaultyBackend {
        fail_insert_call: Some(1),
        ..Default::default()
    });
    let report = Ingestor::new(backend, fast_config())
        .replace_range(rows_for_days(4))
        .await
        .expect("delete succeeds");
    assert_eq!(report.status(), IngestStatus::Failed);
    assert_eq!(report.summary(), "upload failed; no rows were inserted");
}

#[tokio::test]
async fn upload_replaces_only_its_own_date_range() {
    let existing = vec![
        ScheduleRow::new("2025-09-30", "火", "1"),
        ScheduleRow::new("2025-10-15", "水", "1"),
    ];
    let store = Arc::new(InMemoryScheduleStore::with_rows(existing));
    let ingestor = Ingestor::new(store.clone(), fast_config());

    let report = ingestor.import_bytes(UPLOAD.as_bytes()).await.expect("imports");

    assert_eq!(report.status(), IngestStatus::Success);
    assert_eq!(report.deleted_count, 1);
    assert_eq!(report.inserted_count, 2);

    let rows = store.fetch_all().await.unwrap();
    let dates: Vec<&str> = rows.iter().map(|row| row.date.as_str()).collect();
    assert_eq!(dates, ["2025-09-30", "2025-10-01", "2025-10-15"]);

    let slot = rows[0].slot(Year::First, Section::A);
    assert_eq!(slot.content.as_deref(), Some("解剖学"));
    assert_eq!(slot.teacher.as_deref(), Some("山田"));
    assert!(rows[1].slot(Year::First, Section::A).is_exam_like());
}

#[tokio::test]
async fn progress_runs_from_read_to_done() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let store = Arc::new(InMemoryScheduleStore::new());
    let ingestor = Ingestor::new(store, fast_config())
        .with_progress(move |progress| sink.lock().unwrap().push(progress.percent));

    ingestor.import_bytes(UPLOAD.as_bytes()).await.expect("imports");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.first(), Some(&20));
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]), "{seen:?}");
}

#[tokio::test]
async fn missing_date_column_rejects_the_whole_file() {
    let store = Arc::new(InMemoryScheduleStore::new());
    let ingestor = Ingestor::new(store.clone(), fast_config());

    let err = ingestor
        .import_bytes("曜日,時限\n火,1\n".as_bytes())
        .await
        .expect_err("no date column");

    match err {
        IngestError::MissingField(missing) => {
            assert_eq!(missing.row, None);
            assert_eq!(missing.fields, vec!["日付".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn row_without_required_value_names_its_line() {
    let store = Arc::new(InMemoryScheduleStore::new());
    let err = Ingestor::new(store, fast_config())
        .import_bytes("日付,曜日,時限\n2025-09-30,火,1\n2025-10-01,,2\n".as_bytes())
        .await
        .expect_err("second row lacks weekday");
    assert!(err.to_string().contains("row 3"), "{err}");
}

#[tokio::test]
async fn era_dated_row_rejects_upload_and_keeps_stored_rows() {
    let existing = vec![
        ScheduleRow::new("2025-12-01", "月", "1"),
        ScheduleRow::new("2026-04-10", "金", "1"),
        ScheduleRow::new("2027-01-05", "火", "1"),
    ];
    let store = Arc::new(InMemoryScheduleStore::with_rows(existing));
    let ingestor = Ingestor::new(store.clone(), fast_config());

    let err = ingestor
        .import_bytes("日付,曜日,時限\n2025/9/30,火,1\n令和7年10月1日,水,1\n".as_bytes())
        .await
        .expect_err("era date is not a calendar date");

    match err {
        IngestError::InvalidDate { row, value } => {
            assert_eq!(row, 3);
            assert_eq!(value, "令和7-10-01");
        }
        other => panic!("unexpected error: {other}"),
    }
    let dates = store.available_dates().await.unwrap();
    assert_eq!(dates, ["2025-12-01", "2026-04-10", "2027-01-05"]);
}

#[test]
fn header_only_file_is_empty() {
    let err = parse_upload("日付,曜日,時限\n".as_bytes()).expect_err("no rows");
    assert!(matches!(err, IngestError::EmptyFile));
    assert!(matches!(parse_upload(&[]), Err(IngestError::Decode(_))));
}

#[test]
fn blank_rows_are_skipped_and_tabs_detected() {
    let parsed = parse_upload("日付\t曜日\t時間\n2025/9/30\t火\t1\n\t\t\n".as_bytes()).expect("parses");
    assert_eq!(parsed.batch.rows.len(), 1);
    assert_eq!(parsed.batch.skipped_blank_rows, 1);
    assert_eq!(parsed.batch.rows[0].period, "1");
    assert_eq!(parsed.batch.rows[0].date, "2025-09-30");
}

#[test]
fn unmapped_headers_are_reported() {
    let parsed = parse_upload(UPLOAD.as_bytes()).expect("parses");
    assert_eq!(parsed.batch.unmapped_headers, vec!["備考".to_string()]);
}

#[test]
fn analysis_lists_headers_and_samples() {
    let analysis = analyze_bytes(UPLOAD.as_bytes()).expect("analyzes");
    assert_eq!(analysis.row_count, 2);
    assert_eq!(analysis.headers[0], "日付");
    assert_eq!(analysis.sample_data.len(), 2);
    assert_eq!(analysis.sample_data[0]["日付"], "2025-09-30");
    assert!(analysis.sample_data[0]["備考"].is_null());
}

#[test]
fn date_span_covers_min_and_max() {
    let rows = vec![
        ScheduleRow::new("2025-10-02", "木", "1"),
        ScheduleRow::new("2025-09-30", "火", "1"),
        ScheduleRow::new("2025-10-01", "水", "1"),
    ];
    assert_eq!(
        date_span(&rows),
        Some(("2025-09-30".to_string(), "2025-10-02".to_string()))
    );
    assert_eq!(date_span(&[]), None);
}

#[test]
fn date_span_ignores_dates_that_do_not_parse() {
    let rows = vec![
        ScheduleRow::new("2025-09-30", "火", "1"),
        ScheduleRow::new("令和7-10-01", "水", "1"),
        ScheduleRow::new("2025-10-02", "木", "1"),
    ];
    assert_eq!(
        date_span(&rows),
        Some(("2025-09-30".to_string(), "2025-10-02".to_string()))
    );
    assert_eq!(date_span(&[ScheduleRow::new("令和7-10-01", "水", "1")]), None);
}
