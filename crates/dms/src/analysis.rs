//! DMS analysis results and side-effect events

use alerting::{BeepTone, Notifier, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::signals::FrameSignals;
use crate::state::{AlertState, DmsAlert, DrowsinessCause};

/// Side effect requested by one evaluated tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MonitorEvent {
    /// Alert state changed
    Transition { from: AlertState, to: AlertState },

    /// Status text to show
    Status { message: String, severity: Severity },

    /// Sound an alert tone
    Beep(BeepTone),

    /// Append to the alert history
    LogAlert {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

/// Complete DMS analysis result for one tick
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DmsAnalysis {
    /// Whether a face was detected
    pub face_detected: bool,

    /// Geometric signals (face present and landmarks usable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signals: Option<FrameSignals>,

    /// Alert state after this tick
    pub state: AlertState,

    /// Why the drowsiness alert is active
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drowsiness_cause: Option<DrowsinessCause>,

    /// Set when the frame could not be evaluated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,

    /// Side effects to apply, in order
    pub events: Vec<MonitorEvent>,
}

impl DmsAnalysis {
    /// Check if an alert is active
    pub fn has_alerts(&self) -> bool {
        self.state.is_alert()
    }

    pub fn active_alert(&self) -> Option<DmsAlert> {
        self.state.alert()
    }

    /// State change made by this tick, if any
    pub fn transition(&self) -> Option<(AlertState, AlertState)> {
        self.events.iter().find_map(|e| match e {
            MonitorEvent::Transition { from, to } => Some((*from, *to)),
            _ => None,
        })
    }

    /// Apply the events to a notifier. Alert log failures become warnings.
    pub fn dispatch(&self, notifier: &mut dyn Notifier) {
        for event in &self.events {
            match event {
                MonitorEvent::Transition { .. } => {}
                MonitorEvent::Status { message, severity } => {
                    notifier.status_changed(message, *severity);
                }
                MonitorEvent::Beep(tone) => notifier.beep(*tone),
                MonitorEvent::LogAlert { message, timestamp } => {
                    if let Err(e) = notifier.log_alert(message, *timestamp) {
                        warn!("Alert log write failed: {}", e);
                        notifier.warning(&format!("Could not save alert history: {}", e));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::testing::RecordingNotifier;

    fn alert_analysis() -> DmsAnalysis {
        let to = AlertState::Alert(DmsAlert::Drowsiness);
        DmsAnalysis {
            face_detected: true,
            state: to,
            events: vec![
                MonitorEvent::Transition {
                    from: AlertState::Clear,
                    to,
                },
                MonitorEvent::Status {
                    message: to.status_message().to_string(),
                    severity: Severity::Alert,
                },
                MonitorEvent::LogAlert {
                    message: to.status_message().to_string(),
                    timestamp: Utc::now(),
                },
                MonitorEvent::Beep(BeepTone::DROWSINESS),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_dispatch_applies_events_in_order() {
        let mut notifier = RecordingNotifier::new();
        alert_analysis().dispatch(&mut notifier);

        assert_eq!(notifier.statuses(), vec![("ALERT! Drowsiness Detected!", Severity::Alert)]);
        assert_eq!(notifier.logged(), vec!["ALERT! Drowsiness Detected!"]);
        assert_eq!(notifier.beeps(), 1);
        assert_eq!(notifier.warnings(), 0);
    }

    #[test]
    fn test_log_failure_becomes_warning() {
        let mut notifier = RecordingNotifier::failing_logs();
        alert_analysis().dispatch(&mut notifier);

        assert_eq!(notifier.warnings(), 1);
        // the rest of the alert still goes out
        assert_eq!(notifier.beeps(), 1);
        assert_eq!(notifier.statuses().len(), 1);
    }

    #[test]
    fn test_transition_lookup() {
        let analysis = alert_analysis();
        assert_eq!(
            analysis.transition(),
            Some((AlertState::Clear, AlertState::Alert(DmsAlert::Drowsiness)))
        );
        assert!(analysis.has_alerts());
        assert_eq!(DmsAnalysis::default().transition(), None);
    }
}
