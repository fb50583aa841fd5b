pub mod csv_input;
pub mod date;
pub mod encoding;
pub mod header;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod ingest;
pub mod row;
pub mod sanitize;
pub mod store;
pub mod validate;
pub mod views;

pub use date::{canonicalize_date, parse_canonical_date};
pub use encoding::{CandidateEncoding, DecodeError, ScoredCandidate, detect_and_decode};
pub use header::{ScheduleField, normalize_header};
pub use ingest::{
    IngestConfig, IngestError, IngestReport, IngestStatus, Ingestor, ParsedUpload, RowBatch,
    analyze_bytes, parse_upload,
};
pub use row::{ClassFieldKind, ClassSlot, PeriodCount, ScheduleRow, Section, Year};
pub use sanitize::{NormalizedRecord, normalize_record, sanitize_value};
#[cfg(feature = "sqlite")]
pub use store::sqlite::SqliteScheduleStore;
pub use store::{
    ConfigurationError, InMemoryScheduleStore, ScheduleBackend, StoreConfig, StoreError,
};
pub use validate::{MissingFieldError, validate_headers, validate_record};
pub use views::{ClassFilter, RetryPolicy};
