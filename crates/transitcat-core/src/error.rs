// crates/transitcat-core/src/error.rs

use std::path::PathBuf;

use thiserror::Error;
use transitcat_feed::TableError;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("unknown agency '{0}'")]
    UnknownAgency(String),

    #[error("no feed dataset for {scope} under {}", root.display())]
    DatasetNotFound { scope: String, root: PathBuf },

    #[error("expected one feed dataset for {scope} under {}, found {found}", root.display())]
    AmbiguousDataset {
        scope: String,
        root: PathBuf,
        found: usize,
    },

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Database configuration error: {0}")]
    Config(String),

    #[error("feed worker for {unit} failed: {message}")]
    Worker { unit: String, message: String },
}

impl ImportError {
    /// Dataset-level failures are raised before any write happens.
    pub fn is_fatal_dataset_error(&self) -> bool {
        matches!(
            self,
            ImportError::DatasetNotFound { .. }
                | ImportError::AmbiguousDataset { .. }
                | ImportError::Table(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
