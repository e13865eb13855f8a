//! Alert history stores

use crate::StorageError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// One alert history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl AlertRecord {
    pub fn new(timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
        }
    }

    /// `<RFC 3339 timestamp>,<message>` with line breaks flattened
    pub fn to_line(&self) -> String {
        let message: String = self
            .message
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        format!(
            "{},{}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            message
        )
    }

    /// Parse a persisted line. The message may itself contain commas.
    pub fn from_line(line: &str) -> Option<Self> {
        let (timestamp, message) = line.split_once(',')?;
        let timestamp = DateTime::parse_from_rfc3339(timestamp.trim()).ok()?;
        Some(Self {
            timestamp: timestamp.with_timezone(&Utc),
            message: message.to_string(),
        })
    }
}

/// Append-only alert history
pub trait AlertStore: Send + Sync {
    /// Append one record
    fn append(&self, record: &AlertRecord) -> Result<(), StorageError>;

    /// Up to `limit` records, most recent first
    fn recent(&self, limit: usize) -> Result<Vec<AlertRecord>, StorageError>;
}

/// Alert history in a text file, one record per line
#[derive(Debug, Clone)]
pub struct FileAlertStore {
    path: PathBuf,
}

impl FileAlertStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!("Using alert log at {}", path.display());
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AlertStore for FileAlertStore {
    fn append(&self, record: &AlertRecord) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", record.to_line())?;

        debug!("Appended alert record: {}", record.message);
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<AlertRecord>, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let records: Vec<AlertRecord> = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(n, line)| {
                let record = AlertRecord::from_line(line);
                if record.is_none() {
                    warn!("Skipping malformed alert log line {} in {}", n + 1, self.path.display());
                }
                record
            })
            .collect();

        Ok(records.into_iter().rev().take(limit).collect())
    }
}

/// Bounded in-memory alert history
pub struct MemoryAlertStore {
    records: Mutex<VecDeque<AlertRecord>>,
    max_records: usize,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn with_capacity(max_records: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(max_records.min(1000))),
            max_records,
        }
    }

    /// Total stored records
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryAlertStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertStore for MemoryAlertStore {
    fn append(&self, record: &AlertRecord) -> Result<(), StorageError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;

        // Enforce retention
        while records.len() >= self.max_records.max(1) {
            records.pop_front();
        }

        records.push_back(record.clone());
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<AlertRecord>, StorageError> {
        let records = self
            .records
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;

        Ok(records.iter().rev().take(limit).cloned().collect())
    }
}
