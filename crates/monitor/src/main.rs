//! Drowsiness Monitor - Main Entry Point

use std::sync::Arc;

use camera_capture::ImageSequenceSource;
use dms::FaceMeshExtractor;
use monitor::{init_logging, ConsoleNotifier, MonitorController, MonitorSettings};
use storage::FileAlertStore;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    let settings = MonitorSettings::load()?;

    let store = Arc::new(FileAlertStore::new(&settings.alert_log_path));
    let notifier = ConsoleNotifier::new(store);
    notifier.show_history(settings.history_size)?;

    let capture = ImageSequenceSource::new(settings.camera_config());
    let extractor = FaceMeshExtractor::new(&settings.dms_config())?;

    let mut controller = MonitorController::from_settings(&settings);
    controller.start(
        Box::new(capture),
        Box::new(extractor),
        settings.enhancer(),
        Box::new(notifier),
    )?;

    if let Some(shutdown) = controller.shutdown_handle() {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, stopping monitor");
                shutdown.trigger();
            }
        });
    }

    if let Some(summary) = controller.wait().await? {
        info!(
            "Session finished: {} ticks, {} skipped, {} alerts",
            summary.ticks, summary.skipped, summary.alerts
        );
    }

    Ok(())
}
