//! Console notifier: status lines on stdout, terminal bell, alert log on disk

use std::io::Write;
use std::sync::Arc;

use alerting::{BeepTone, Notifier, NotifyError, Severity};
use chrono::{DateTime, Utc};
use storage::{AlertRecord, AlertStore};
use tracing::{debug, info, warn};

pub struct ConsoleNotifier {
    store: Arc<dyn AlertStore>,
    last_status: Option<String>,
}

impl ConsoleNotifier {
    pub fn new(store: Arc<dyn AlertStore>) -> Self {
        Self {
            store,
            last_status: None,
        }
    }

    /// Status text currently shown
    pub fn last_status(&self) -> Option<&str> {
        self.last_status.as_deref()
    }

    /// Print the alert history, most recent first
    pub fn show_history(&self, limit: usize) -> Result<usize, storage::StorageError> {
        let records = self.store.recent(limit)?;
        if records.is_empty() {
            println!("No previous alerts.");
        } else {
            println!("Recent alerts:");
            for record in &records {
                println!("  {}", record.to_line());
            }
        }
        Ok(records.len())
    }
}

impl Notifier for ConsoleNotifier {
    fn status_changed(&mut self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => info!("{}", message),
            Severity::Alert => warn!("{}", message),
        }
        println!("[{}] {}", severity.as_str().to_uppercase(), message);
        self.last_status = Some(message.to_string());
    }

    fn beep(&mut self, tone: BeepTone) {
        debug!(frequency_hz = tone.frequency_hz, duration_ms = tone.duration_ms, "Beep");
        let mut stdout = std::io::stdout();
        if let Err(e) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
            warn!("{}", NotifyError::Audio(e.to_string()));
        }
    }

    fn log_alert(&mut self, message: &str, timestamp: DateTime<Utc>) -> Result<(), NotifyError> {
        self.store
            .append(&AlertRecord::new(timestamp, message))
            .map_err(|e| NotifyError::Persistence(e.to_string()))
    }

    fn warning(&mut self, message: &str) {
        warn!("{}", message);
        eprintln!("Warning: {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::{FileAlertStore, MemoryAlertStore};

    #[test]
    fn test_log_alert_appends_to_store() {
        let store = Arc::new(MemoryAlertStore::new());
        let mut notifier = ConsoleNotifier::new(store.clone());

        notifier
            .log_alert("ALERT! Drowsiness Detected!", Utc::now())
            .unwrap();

        let recent = store.recent(5).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].message, "ALERT! Drowsiness Detected!");
    }

    #[test]
    fn test_unwritable_log_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        // a directory where the log file should be
        let store = Arc::new(FileAlertStore::new(dir.path()));
        let mut notifier = ConsoleNotifier::new(store);

        let result = notifier.log_alert("ALERT! Face not visible", Utc::now());
        assert!(matches!(result, Err(NotifyError::Persistence(_))));
    }

    #[test]
    fn test_status_is_remembered() {
        let mut notifier = ConsoleNotifier::new(Arc::new(MemoryAlertStore::new()));
        assert_eq!(notifier.last_status(), None);
        notifier.status_changed("Monitoring is ON", Severity::Info);
        assert_eq!(notifier.last_status(), Some("Monitoring is ON"));
    }

    #[test]
    fn test_show_history_counts_records() {
        let store = Arc::new(MemoryAlertStore::new());
        let notifier = ConsoleNotifier::new(store.clone());
        assert_eq!(notifier.show_history(5).unwrap(), 0);

        for i in 0..7 {
            store
                .append(&AlertRecord::new(Utc::now(), format!("alert {}", i)))
                .unwrap();
        }
        assert_eq!(notifier.show_history(5).unwrap(), 5);
    }
}
