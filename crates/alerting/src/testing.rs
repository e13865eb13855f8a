//! In-memory notifier for tests and simulations

use chrono::{DateTime, Utc};

use crate::{BeepTone, Notifier, NotifyError, Severity};

/// One recorded side effect
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Status { message: String, severity: Severity },
    Beep(BeepTone),
    Logged { message: String, timestamp: DateTime<Utc> },
    Warning(String),
}

/// Records every call; can be told to fail log writes.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub notifications: Vec<Notification>,
    pub fail_log_writes: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_logs() -> Self {
        Self {
            fail_log_writes: true,
            ..Default::default()
        }
    }

    pub fn statuses(&self) -> Vec<(&str, Severity)> {
        self.notifications
            .iter()
            .filter_map(|n| match n {
                Notification::Status { message, severity } => Some((message.as_str(), *severity)),
                _ => None,
            })
            .collect()
    }

    pub fn beeps(&self) -> usize {
        self.notifications
            .iter()
            .filter(|n| matches!(n, Notification::Beep(_)))
            .count()
    }

    pub fn logged(&self) -> Vec<&str> {
        self.notifications
            .iter()
            .filter_map(|n| match n {
                Notification::Logged { message, .. } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> usize {
        self.notifications
            .iter()
            .filter(|n| matches!(n, Notification::Warning(_)))
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn status_changed(&mut self, message: &str, severity: Severity) {
        self.notifications.push(Notification::Status {
            message: message.to_string(),
            severity,
        });
    }

    fn beep(&mut self, tone: BeepTone) {
        self.notifications.push(Notification::Beep(tone));
    }

    fn log_alert(&mut self, message: &str, timestamp: DateTime<Utc>) -> Result<(), NotifyError> {
        if self.fail_log_writes {
            return Err(NotifyError::Persistence("log store unavailable".to_string()));
        }
        self.notifications.push(Notification::Logged {
            message: message.to_string(),
            timestamp,
        });
        Ok(())
    }

    fn warning(&mut self, message: &str) {
        self.notifications.push(Notification::Warning(message.to_string()));
    }
}
