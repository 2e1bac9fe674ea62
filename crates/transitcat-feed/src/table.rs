use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::errors::TableError;
use crate::fingerprint::{Fingerprint, FingerprintReader};

const BOM: char = '\u{feff}';

/// Column positions of a table, keyed by trimmed header name.
#[derive(Debug, Clone)]
pub struct Header {
    index: HashMap<String, usize>,
}

impl Header {
    fn from_record(record: &StringRecord) -> Self {
        let mut index = HashMap::with_capacity(record.len());
        for (idx, name) in record.iter().enumerate() {
            let name = if idx == 0 {
                name.trim_start_matches(BOM)
            } else {
                name
            };
            let name = name.trim();
            if !name.is_empty() {
                index.entry(name.to_string()).or_insert(idx);
            }
        }

        Self { index }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Absent columns bind to a handle that always reads as empty.
    pub fn column(&self, name: &str) -> Column {
        Column(self.position(name))
    }
}

/// A column handle resolved once per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column(Option<usize>);

impl Column {
    pub fn is_present(&self) -> bool {
        self.0.is_some()
    }
}

/// One decoded data row. Values are trimmed; short rows read as empty.
#[derive(Debug)]
pub struct Row<'a> {
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    pub fn get(&self, column: Column) -> &'a str {
        column
            .0
            .and_then(|idx| self.record.get(idx))
            .map(str::trim)
            .unwrap_or("")
    }

    pub fn value(&self, column: Column) -> Option<&'a str> {
        let value = self.get(column);
        (!value.is_empty()).then_some(value)
    }
}

/// Typed column layout for one table, bound against the header before any row is read.
pub trait TableSchema: Sized {
    const REQUIRED: &'static [&'static str];

    fn bind(header: &Header) -> Self;
}

#[derive(Debug, Clone)]
pub struct TableSummary {
    pub rows: u64,
    pub fingerprint: Fingerprint,
}

pub struct TableReader<R: Read> {
    name: String,
    reader: csv::Reader<FingerprintReader<R>>,
}

impl TableReader<File> {
    pub fn open(path: &Path) -> Result<Self, TableError> {
        let name = path.display().to_string();
        let file = File::open(path).map_err(|source| TableError::Open {
            table: name.clone(),
            source,
        })?;
        Ok(Self::from_reader(name, file))
    }
}

impl<R: Read> TableReader<R> {
    pub fn from_reader(name: impl Into<String>, reader: R) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(FingerprintReader::new(reader));
        Self {
            name: name.into(),
            reader,
        }
    }

    /// Streams every data row through `on_row`, one record buffered at a time.
    ///
    /// The header is the first non-blank record. Columns listed in
    /// `S::REQUIRED` must all be present or nothing is handed to `on_row`.
    pub fn for_each_row<S, F>(mut self, mut on_row: F) -> Result<TableSummary, TableError>
    where
        S: TableSchema,
        F: FnMut(&S, &Row<'_>),
    {
        let mut record = StringRecord::new();
        let header = self.read_header(&mut record)?;

        let missing: Vec<&'static str> = S::REQUIRED
            .iter()
            .copied()
            .filter(|column| !header.contains(column))
            .collect();
        if !missing.is_empty() {
            return Err(TableError::MissingColumns {
                table: self.name,
                missing,
            });
        }

        let schema = S::bind(&header);
        let mut rows = 0u64;

        while self.next_record(&mut record)? {
            if is_blank(&record) {
                continue;
            }
            rows += 1;
            on_row(&schema, &Row { record: &record });
        }

        let fingerprint = self.reader.into_inner().finish();
        Ok(TableSummary { rows, fingerprint })
    }

    fn read_header(&mut self, record: &mut StringRecord) -> Result<Header, TableError> {
        while self.next_record(record)? {
            if !is_blank(record) {
                return Ok(Header::from_record(record));
            }
        }
        Err(TableError::MissingHeader {
            table: self.name.clone(),
        })
    }

    fn next_record(&mut self, record: &mut StringRecord) -> Result<bool, TableError> {
        self.reader
            .read_record(record)
            .map_err(|source| TableError::Csv {
                table: self.name.clone(),
                line: source.position().map(|pos| pos.line()).unwrap_or(0),
                source,
            })
    }
}

fn is_blank(record: &StringRecord) -> bool {
    record
        .iter()
        .all(|field| field.trim_matches(|c: char| c.is_whitespace() || c == BOM).is_empty())
}
