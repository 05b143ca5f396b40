//! Application state shared across handlers.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use telemetry_store::{MeasurementStore, SensorStore};

/// Shared application state.
///
/// Both stores are injected at construction; handlers never open their own.
pub struct AppState {
    /// The sensor registry (wrapped in Mutex for thread-safe access).
    pub sensors: Mutex<SensorStore>,
    /// The measurement backend selected by configuration.
    pub measurements: Arc<dyn MeasurementStore>,
}

impl AppState {
    /// Create new application state.
    pub fn new(sensors: SensorStore, measurements: Arc<dyn MeasurementStore>) -> Arc<Self> {
        Arc::new(Self {
            sensors: Mutex::new(sensors),
            measurements,
        })
    }

    /// Close both stores.
    ///
    /// Failures are logged; closing continues with the next store.
    pub async fn close(self) {
        info!("Closing stores");

        if let Err(e) = self.sensors.into_inner().close() {
            warn!("Failed to close sensor store: {}", e);
        }
        if let Err(e) = self.measurements.close().await {
            warn!(
                "Failed to close {} measurement store: {}",
                self.measurements.backend(),
                e
            );
        }
    }
}
