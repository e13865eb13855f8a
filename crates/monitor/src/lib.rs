//! Drowsiness Monitor
//!
//! Runtime around the DMS core: settings loading, the tick loop driving
//! capture and evaluation, and a console notifier backed by the alert log.

pub mod notifier;
pub mod runner;
pub mod settings;

pub use notifier::ConsoleNotifier;
pub use runner::{MonitorController, RunSummary, ShutdownHandle};
pub use settings::MonitorSettings;

use camera_capture::CameraError;
use dms::DmsError;
use storage::StorageError;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Monitor error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("DMS error: {0}")]
    Dms(#[from] DmsError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Monitoring is already running")]
    AlreadyRunning,

    #[error("Monitor task failed: {0}")]
    Join(String),
}

/// Initialize logging
pub fn init_logging() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
