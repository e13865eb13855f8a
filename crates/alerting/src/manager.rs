//! Beep repeat scheduling

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// When an active alert re-sounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BeepPolicy {
    /// Sound once when the alert is entered
    OnTransition,
    /// Sound on entry, then again every `interval_ms` while the alert persists
    Repeat { interval_ms: u64 },
}

impl Default for BeepPolicy {
    fn default() -> Self {
        BeepPolicy::Repeat { interval_ms: 1000 }
    }
}

impl BeepPolicy {
    /// `0` means "transition only"
    pub fn from_repeat_ms(interval_ms: u64) -> Self {
        if interval_ms == 0 {
            BeepPolicy::OnTransition
        } else {
            BeepPolicy::Repeat { interval_ms }
        }
    }
}

/// Firing state of one alert kind
#[derive(Debug, Clone)]
pub struct FireState {
    /// Last time this alert sounded
    pub last_fired: Instant,
    /// Number of times sounded since the alert was entered
    pub fire_count: usize,
}

/// Decides when an active alert sounds.
///
/// Keyed by alert kind; `clear` must be called when the alert is left so the
/// next entry sounds immediately.
#[derive(Debug)]
pub struct BeepScheduler {
    policy: BeepPolicy,
    states: HashMap<&'static str, FireState>,
}

impl BeepScheduler {
    pub fn new(policy: BeepPolicy) -> Self {
        Self {
            policy,
            states: HashMap::new(),
        }
    }

    pub fn policy(&self) -> BeepPolicy {
        self.policy
    }

    /// Check whether `kind` should sound at `now`
    pub fn should_fire(&self, kind: &str, now: Instant) -> bool {
        let Some(state) = self.states.get(kind) else {
            return true;
        };

        match self.policy {
            BeepPolicy::OnTransition => false,
            BeepPolicy::Repeat { interval_ms } => {
                let due = now.saturating_duration_since(state.last_fired)
                    >= Duration::from_millis(interval_ms);
                if !due {
                    debug!("Beep for {} suppressed: repeat interval not elapsed", kind);
                }
                due
            }
        }
    }

    /// Record that `kind` sounded at `now`
    pub fn record_fire(&mut self, kind: &'static str, now: Instant) {
        let state = self.states.entry(kind).or_insert(FireState {
            last_fired: now,
            fire_count: 0,
        });
        state.last_fired = now;
        state.fire_count += 1;
    }

    /// Sound count for `kind` since it was entered
    pub fn fire_count(&self, kind: &str) -> usize {
        self.states.get(kind).map_or(0, |s| s.fire_count)
    }

    /// Forget all alert kinds
    pub fn clear(&mut self) {
        self.states.clear();
    }
}

impl Default for BeepScheduler {
    fn default() -> Self {
        Self::new(BeepPolicy::default())
    }
}
