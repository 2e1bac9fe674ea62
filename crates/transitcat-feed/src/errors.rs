use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("{table}: failed to open: {source}")]
    Open {
        table: String,
        #[source]
        source: io::Error,
    },

    #[error("{table}: no header row found")]
    MissingHeader { table: String },

    #[error("{table}: missing required columns: {}", missing.join(", "))]
    MissingColumns {
        table: String,
        missing: Vec<&'static str>,
    },

    #[error("{table} line {line}: {source}")]
    Csv {
        table: String,
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("{table}: failed to write: {source}")]
    Write {
        table: String,
        #[source]
        source: csv::Error,
    },

    #[error("{table}: input and output must be different files")]
    SameFile { table: String },
}
