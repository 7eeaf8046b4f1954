//! Tabular input: header normalisation and cell lookup

use std::collections::HashMap;

use csv::{ReaderBuilder, StringRecord, Trim};

/// First data row number; row 1 is the header.
pub const FIRST_DATA_ROW: usize = 2;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Reasons a file is rejected as a whole.
#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    #[error("csv requires a header row and at least one data row")]
    NoDataRows,

    #[error("malformed csv: {0}")]
    Malformed(#[from] csv::Error),
}

/// Column positions keyed by normalised header name.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    columns: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn new(header: &StringRecord) -> Self {
        let mut columns = HashMap::with_capacity(header.len());
        for (idx, name) in header.iter().enumerate() {
            // First occurrence wins for duplicated headers.
            columns.entry(normalize(name)).or_insert(idx);
        }
        Self { columns }
    }

    /// Cell for `name` in `record`; `""` when the column or cell is absent.
    pub fn cell<'r>(&self, record: &'r StringRecord, name: &str) -> &'r str {
        self.columns
            .get(name)
            .and_then(|&idx| record.get(idx))
            .unwrap_or("")
    }
}

/// Lowercase, trimmed, byte-order mark removed.
fn normalize(name: &str) -> String {
    name.trim_start_matches(BYTE_ORDER_MARK).trim().to_lowercase()
}

/// A parsed upload: header plus data rows in input order.
#[derive(Debug, Clone)]
pub struct CsvTable {
    header: HeaderIndex,
    rows: Vec<StringRecord>,
}

impl CsvTable {
    /// Parse UTF-8 comma separated text with a header row.
    ///
    /// Rows may have fewer or more cells than the header; cells are trimmed.
    pub fn parse(input: &[u8]) -> Result<Self, CsvError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(input);

        let header = HeaderIndex::new(reader.headers()?);
        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;

        if rows.is_empty() {
            return Err(CsvError::NoDataRows);
        }

        Ok(Self { header, rows })
    }

    pub fn header(&self) -> &HeaderIndex {
        &self.header
    }

    /// Number of data rows, header excluded.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Data rows paired with their 1-based file row number.
    pub fn rows(&self) -> impl Iterator<Item = (usize, &StringRecord)> {
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, record)| (idx + FIRST_DATA_ROW, record))
    }
}
