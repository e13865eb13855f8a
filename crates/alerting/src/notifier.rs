//! Notifier contract

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Notification errors
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Alert log write failed: {0}")]
    Persistence(String),
    #[error("Audio output failed: {0}")]
    Audio(String),
}

/// Status severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Alert,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Alert => "alert",
        }
    }
}

/// Audible tone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeepTone {
    pub frequency_hz: u32,
    pub duration_ms: u64,
}

impl BeepTone {
    pub const fn new(frequency_hz: u32, duration_ms: u64) -> Self {
        Self {
            frequency_hz,
            duration_ms,
        }
    }

    /// Tone used for drowsiness alerts
    pub const DROWSINESS: BeepTone = BeepTone::new(1000, 1000);

    /// Tone used when the face has left the frame
    pub const FACE_ABSENT: BeepTone = BeepTone::new(600, 500);
}

/// Consumer of monitoring side effects.
///
/// `beep` is fire-and-forget and is only invoked when audible alerts are
/// enabled. A failing `log_alert` must never block the alert decision path;
/// callers report it through `warning` instead.
pub trait Notifier: Send {
    /// Status text changed
    fn status_changed(&mut self, message: &str, severity: Severity);

    /// Play a tone
    fn beep(&mut self, tone: BeepTone);

    /// Append an alert record
    fn log_alert(&mut self, message: &str, timestamp: DateTime<Utc>) -> Result<(), NotifyError>;

    /// Surface a non-fatal problem to the user
    fn warning(&mut self, message: &str) {
        warn!("{}", message);
    }
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn status_changed(&mut self, message: &str, severity: Severity) {
        (**self).status_changed(message, severity)
    }

    fn beep(&mut self, tone: BeepTone) {
        (**self).beep(tone)
    }

    fn log_alert(&mut self, message: &str, timestamp: DateTime<Utc>) -> Result<(), NotifyError> {
        (**self).log_alert(message, timestamp)
    }

    fn warning(&mut self, message: &str) {
        (**self).warning(message)
    }
}
