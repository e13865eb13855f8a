//! Storage Layer
//!
//! Persists the alert history as append-only text records and serves the
//! most recent entries for display.

mod repository;

pub use repository::{AlertRecord, AlertStore, FileAlertStore, MemoryAlertStore};

use thiserror::Error;

/// Default number of records shown in the alert history
pub const DEFAULT_HISTORY_SIZE: usize = 5;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Lock error: {0}")]
    Lock(String),
}
