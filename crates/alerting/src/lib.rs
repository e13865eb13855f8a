//! Alerting System
//!
//! Provides the notifier contract driven by the monitoring core, alert tones,
//! and the beep repeat policy.

mod manager;
mod notifier;
pub mod testing;

pub use manager::{BeepPolicy, BeepScheduler, FireState};
pub use notifier::{BeepTone, Notifier, NotifyError, Severity};
