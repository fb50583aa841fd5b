use csv::{ReaderBuilder, StringRecord, Trim};

/// One tokenized data line: raw headers paired with raw cell text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub line: usize,
    pub cells: Vec<(String, String)>,
}

impl RawRecord {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells
            .iter()
            .map(|(header, value)| (header.as_str(), value.as_str()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<RawRecord>,
}

/// Tab is used only when the first line has tabs and no commas.
pub fn detect_delimiter(text: &str) -> u8 {
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.contains('\t') && !first_line.contains(',') {
        b'\t'
    } else {
        b','
    }
}

pub fn parse_table(text: &str) -> Result<RawTable, csv::Error> {
    let delimiter = detect_delimiter(text);
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::None)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut records = Vec::new();
    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        let line = record
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or(records.len() + 2);
        let cells = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| (header.clone(), record.get(idx).unwrap_or("").to_string()))
            .collect();
        records.push(RawRecord { line, cells });
    }

    tracing::debug!(
        delimiter = %char::from(delimiter).escape_default(),
        columns = headers.len(),
        rows = records.len(),
        "tokenized upload"
    );
    Ok(RawTable { headers, records })
}
