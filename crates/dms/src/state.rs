//! Driver alert state

use alerting::Severity;
use serde::{Deserialize, Serialize};

/// Status text while monitoring with no alert
pub const MONITORING_ON: &str = "Monitoring is ON";
/// Status text once monitoring stops
pub const MONITORING_OFF: &str = "Monitoring is OFF";

/// DMS alert types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DmsAlert {
    /// Eyes closed or head tilted for too long
    Drowsiness,

    /// Face not visible (driver turned away, camera blocked?)
    FaceNotVisible,
}

impl DmsAlert {
    /// Stable key for logging and beep scheduling
    pub fn key(&self) -> &'static str {
        match self {
            DmsAlert::Drowsiness => "drowsiness",
            DmsAlert::FaceNotVisible => "face_not_visible",
        }
    }

    /// User-facing status text
    pub fn message(&self) -> &'static str {
        match self {
            DmsAlert::Drowsiness => "ALERT! Drowsiness Detected!",
            DmsAlert::FaceNotVisible => "ALERT! Face not visible",
        }
    }
}

/// What made a drowsiness alert fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrowsinessCause {
    EyesClosed,
    HeadTilted,
    Both,
}

impl DrowsinessCause {
    pub fn from_flags(eyes_closed: bool, head_tilted: bool) -> Option<Self> {
        match (eyes_closed, head_tilted) {
            (true, true) => Some(DrowsinessCause::Both),
            (true, false) => Some(DrowsinessCause::EyesClosed),
            (false, true) => Some(DrowsinessCause::HeadTilted),
            (false, false) => None,
        }
    }
}

/// Alert state, recomputed every evaluated tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlertState {
    #[default]
    Clear,
    Alert(DmsAlert),
}

impl AlertState {
    pub fn is_alert(&self) -> bool {
        matches!(self, AlertState::Alert(_))
    }

    pub fn alert(&self) -> Option<DmsAlert> {
        match self {
            AlertState::Clear => None,
            AlertState::Alert(alert) => Some(*alert),
        }
    }

    pub fn status_message(&self) -> &'static str {
        match self {
            AlertState::Clear => MONITORING_ON,
            AlertState::Alert(alert) => alert.message(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            AlertState::Clear => Severity::Info,
            AlertState::Alert(_) => Severity::Alert,
        }
    }
}
