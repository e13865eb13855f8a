//! Monitoring session: turns per-tick decisions into edge-triggered events

use std::time::Instant;

use alerting::{BeepScheduler, BeepTone, Severity};
use chrono::Utc;
use tracing::{info, warn};

use crate::analysis::{DmsAnalysis, MonitorEvent};
use crate::detector::Detection;
use crate::machine::AlertStateMachine;
use crate::state::{AlertState, DmsAlert, MONITORING_ON};
use crate::DmsConfig;

/// State owned by one monitoring run.
///
/// Status, transition and log events are emitted only when the alert state
/// changes. Beeps follow the configured `BeepPolicy` while an alert is active.
#[derive(Debug)]
pub struct MonitoringSession {
    machine: AlertStateMachine,
    beeps: BeepScheduler,
    beep_enabled: bool,
    drowsiness_tone: BeepTone,
    face_absent_tone: BeepTone,
    announced: bool,
    ticks: u64,
    alerts_raised: u64,
}

impl MonitoringSession {
    pub fn new(config: &DmsConfig) -> Self {
        Self {
            machine: AlertStateMachine::new(config),
            beeps: BeepScheduler::new(config.beep_policy),
            beep_enabled: config.beep_enabled,
            drowsiness_tone: config.drowsiness_tone,
            face_absent_tone: config.face_absent_tone,
            announced: false,
            ticks: 0,
            alerts_raised: 0,
        }
    }

    pub fn state(&self) -> AlertState {
        self.machine.state()
    }

    pub fn machine(&self) -> &AlertStateMachine {
        &self.machine
    }

    pub fn beep_enabled(&self) -> bool {
        self.beep_enabled
    }

    /// Toggle audible alerts; takes effect on the next tick
    pub fn set_beep_enabled(&mut self, enabled: bool) {
        self.beep_enabled = enabled;
    }

    /// Ticks evaluated so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Alert entries so far
    pub fn alerts_raised(&self) -> u64 {
        self.alerts_raised
    }

    fn tone_for(&self, alert: DmsAlert) -> BeepTone {
        match alert {
            DmsAlert::Drowsiness => self.drowsiness_tone,
            DmsAlert::FaceNotVisible => self.face_absent_tone,
        }
    }

    /// Evaluate one tick's detection
    pub fn evaluate(
        &mut self,
        detection: &Detection,
        frame_width: u32,
        frame_height: u32,
        now: Instant,
    ) -> DmsAnalysis {
        self.ticks += 1;
        let mut events = Vec::new();

        if !self.announced {
            self.announced = true;
            events.push(MonitorEvent::Status {
                message: MONITORING_ON.to_string(),
                severity: Severity::Info,
            });
        }

        let eval = self.machine.evaluate(detection, frame_width, frame_height, now);

        if eval.changed() {
            self.beeps.clear();
            events.push(MonitorEvent::Transition {
                from: eval.previous,
                to: eval.state,
            });
            events.push(MonitorEvent::Status {
                message: eval.state.status_message().to_string(),
                severity: eval.state.severity(),
            });

            match eval.state {
                AlertState::Alert(alert) => {
                    self.alerts_raised += 1;
                    warn!(alert = alert.key(), cause = ?eval.cause, "{}", alert.message());
                    events.push(MonitorEvent::LogAlert {
                        message: alert.message().to_string(),
                        timestamp: Utc::now(),
                    });
                }
                AlertState::Clear => info!("Alert cleared, back to monitoring"),
            }
        }

        if let AlertState::Alert(alert) = eval.state {
            if self.beep_enabled && self.beeps.should_fire(alert.key(), now) {
                self.beeps.record_fire(alert.key(), now);
                events.push(MonitorEvent::Beep(self.tone_for(alert)));
            }
        }

        DmsAnalysis {
            face_detected: eval.face_present,
            signals: eval.signals,
            state: eval.state,
            drowsiness_cause: eval.cause,
            skipped: eval.skipped,
            events,
        }
    }

    /// Back to a fresh session with the same configuration
    pub fn reset(&mut self) {
        self.machine.reset();
        self.beeps.clear();
        self.announced = false;
        self.ticks = 0;
        self.alerts_raised = 0;
    }
}
