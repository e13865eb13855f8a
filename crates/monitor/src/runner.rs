//! Tick loop and start/stop control

use std::sync::Arc;
use std::time::Duration;

use alerting::{Notifier, Severity};
use camera_capture::{CaptureSource, FrameEnhancer};
use dms::{DmsConfig, DmsModule, GeometryExtractor, MONITORING_OFF};
use metrics::counter;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{MonitorError, MonitorSettings};

/// What one monitoring run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Ticks the loop woke up for
    pub ticks: u64,
    /// Ticks with no frame to evaluate
    pub skipped: u64,
    /// Alerts entered
    pub alerts: u64,
    /// The capture source ran out of frames
    pub end_of_stream: bool,
}

/// Requests shutdown of a running loop from another task
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        // receiver gone means the loop already exited
        let _ = self.tx.send(true);
    }
}

struct RunningMonitor {
    shutdown: Arc<watch::Sender<bool>>,
    beep: watch::Sender<bool>,
    handle: JoinHandle<RunSummary>,
}

/// Owns at most one monitoring loop.
///
/// `start` opens the capture source and extractor and spawns the loop with a
/// fresh session; `stop` ends it and waits until both are released.
pub struct MonitorController {
    config: DmsConfig,
    tick_interval: Duration,
    running: Option<RunningMonitor>,
}

impl MonitorController {
    pub fn new(config: DmsConfig, tick_interval: Duration) -> Self {
        Self {
            config,
            tick_interval,
            running: None,
        }
    }

    pub fn from_settings(settings: &MonitorSettings) -> Self {
        Self::new(settings.dms_config(), settings.tick_interval())
    }

    /// Whether a loop is alive
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    pub fn shutdown_handle(&self) -> Option<ShutdownHandle> {
        self.running.as_ref().map(|running| ShutdownHandle {
            tx: running.shutdown.clone(),
        })
    }

    /// Toggle audible alerts, live if a loop is running
    pub fn set_beep_enabled(&mut self, enabled: bool) {
        self.config.beep_enabled = enabled;
        if let Some(running) = &self.running {
            let _ = running.beep.send(enabled);
        }
    }

    pub fn start(
        &mut self,
        mut capture: Box<dyn CaptureSource>,
        extractor: Box<dyn GeometryExtractor>,
        enhancer: Box<dyn FrameEnhancer>,
        notifier: Box<dyn Notifier>,
    ) -> Result<(), MonitorError> {
        if self.is_running() {
            return Err(MonitorError::AlreadyRunning);
        }
        // reap a loop that ended on its own
        self.running = None;

        capture.open()?;
        let dms = match DmsModule::new(self.config.clone(), extractor, enhancer) {
            Ok(dms) => dms,
            Err(e) => {
                capture.close();
                return Err(e.into());
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (beep_tx, beep_rx) = watch::channel(self.config.beep_enabled);
        let handle = tokio::spawn(run_loop(
            capture,
            dms,
            notifier,
            self.tick_interval,
            shutdown_rx,
            beep_rx,
        ));

        info!("Monitoring started at {:?} per tick", self.tick_interval);
        self.running = Some(RunningMonitor {
            shutdown: Arc::new(shutdown_tx),
            beep: beep_tx,
            handle,
        });
        Ok(())
    }

    /// Signal the loop to stop and wait for it. `None` if nothing was running.
    pub async fn stop(&mut self) -> Result<Option<RunSummary>, MonitorError> {
        let Some(running) = self.running.take() else {
            return Ok(None);
        };
        let _ = running.shutdown.send(true);
        Self::join(running).await.map(Some)
    }

    /// Wait for the loop to end on its own (end of stream or shutdown handle)
    pub async fn wait(&mut self) -> Result<Option<RunSummary>, MonitorError> {
        let Some(running) = self.running.take() else {
            return Ok(None);
        };
        Self::join(running).await.map(Some)
    }

    async fn join(running: RunningMonitor) -> Result<RunSummary, MonitorError> {
        let summary = running
            .handle
            .await
            .map_err(|e| MonitorError::Join(e.to_string()))?;
        info!(
            ticks = summary.ticks,
            skipped = summary.skipped,
            alerts = summary.alerts,
            "Monitoring stopped"
        );
        Ok(summary)
    }
}

async fn run_loop(
    mut capture: Box<dyn CaptureSource>,
    mut dms: DmsModule,
    mut notifier: Box<dyn Notifier>,
    tick_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut beep: watch::Receiver<bool>,
) -> RunSummary {
    let mut ticker = time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut summary = RunSummary::default();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        summary.ticks += 1;
        counter!("monitor_ticks_total").increment(1);

        if beep.has_changed().unwrap_or(false) {
            let enabled = *beep.borrow_and_update();
            dms.session_mut().set_beep_enabled(enabled);
            info!("Audible alerts {}", if enabled { "enabled" } else { "disabled" });
        }

        let frame = match capture.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("Capture source reached end of stream");
                summary.end_of_stream = true;
                break;
            }
            Err(e) => {
                warn!("Skipping tick, no frame: {}", e);
                summary.skipped += 1;
                counter!("monitor_ticks_skipped_total").increment(1);
                continue;
            }
        };

        let analysis = dms.analyze(&frame, Instant::now().into_std());
        if let Some(reason) = &analysis.skipped {
            debug!("Frame {} not evaluated: {}", frame.sequence, reason);
        }
        if let Some((_, to)) = analysis.transition() {
            if to.is_alert() {
                summary.alerts += 1;
                counter!("monitor_alerts_total").increment(1);
            }
        }
        analysis.dispatch(notifier.as_mut());
    }

    capture.close();
    dms.shutdown();
    notifier.status_changed(MONITORING_OFF, Severity::Info);
    summary
}
