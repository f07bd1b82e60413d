//! Tabular row sources.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};

use ontoload_core::{IngestError, IngestResult, Row};

/// Yields rows keyed by column name.
///
/// A malformed record is an `Err` item; reading continues with the next one.
pub trait RowSource {
    fn headers(&self) -> &[String];
    fn next_row(&mut self) -> Option<IngestResult<Row>>;

    fn collect_rows(&mut self) -> Vec<IngestResult<Row>> {
        std::iter::from_fn(|| self.next_row()).collect()
    }
}

/// CSV with a header line.
pub struct CsvRowSource<R> {
    reader: csv::Reader<R>,
    headers: Vec<String>,
    record: StringRecord,
    line: usize,
}

impl CsvRowSource<std::fs::File> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("Failed to read header of {}", path.display()))
    }
}

impl<R: Read> CsvRowSource<R> {
    pub fn from_reader(input: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(input);
        let headers = reader.headers()?.iter().map(str::to_string).collect();
        Ok(Self {
            reader,
            headers,
            record: StringRecord::new(),
            line: 0,
        })
    }
}

impl<R: Read> RowSource for CsvRowSource<R> {
    fn headers(&self) -> &[String] {
        &self.headers
    }

    fn next_row(&mut self) -> Option<IngestResult<Row>> {
        self.line += 1;
        match self.reader.read_record(&mut self.record) {
            Ok(false) => None,
            Ok(true) => Some(Ok(self
                .headers
                .iter()
                .cloned()
                .zip(self.record.iter().map(str::to_string))
                .collect())),
            Err(err) => Some(Err(IngestError::InvalidSource(format!(
                "data line {}: {}",
                self.line, err
            )))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_keyed_by_header() {
        let data = "id, name\n1, Alice\n2,Bob\n";
        let mut source = CsvRowSource::from_reader(data.as_bytes()).unwrap();
        assert_eq!(source.headers(), ["id", "name"]);

        let rows = source.collect_rows();
        assert_eq!(rows.len(), 2);
        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.get("id").map(String::as_str), Some("1"));
        assert_eq!(first.get("name").map(String::as_str), Some("Alice"));
    }

    #[test]
    fn test_malformed_record_reports_line_and_continues() {
        let data = "id,name\n1,Alice\n2\n3,Carol\n";
        let mut source = CsvRowSource::from_reader(data.as_bytes()).unwrap();
        let rows = source.collect_rows();

        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_ok());
        match &rows[1] {
            Err(IngestError::InvalidSource(msg)) => assert!(msg.starts_with("data line 2")),
            other => panic!("expected a malformed record, got {other:?}"),
        }
        assert!(rows[2].is_ok());
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CsvRowSource::open(&dir.path().join("entity_ghost.csv")).is_err());
    }

    #[test]
    fn test_open_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entity_student.csv");
        std::fs::write(&path, "id\n7\n").unwrap();
        let rows = CsvRowSource::open(&path).unwrap().collect_rows();
        assert_eq!(rows.len(), 1);
    }
}
