//! Storage for the sensor telemetry service.
//!
//! Two stores live here:
//!
//! - [`SensorStore`]: the sensor registry, kept in SQLite, with a location
//!   index for nearest-sensor lookups
//! - [`MeasurementStore`]: an async trait over time-series storage, with a
//!   local SQLite backend ([`LocalMeasurementStore`]) and an InfluxDB 2.x
//!   backend ([`InfluxMeasurementStore`])
//!
//! # Example
//!
//! ```no_run
//! use telemetry_store::SensorStore;
//! use telemetry_types::{GeoPoint, NewSensor};
//!
//! let store = SensorStore::open(telemetry_store::default_db_path())?;
//! let sensor = store.create_sensor(NewSensor {
//!     name: "greenhouse".to_string(),
//!     location: GeoPoint::new(-46.63, -23.55),
//!     tags: vec!["outdoor".to_string()],
//! })?;
//!
//! let nearest = store.get_nearest_sensor(-23.55, -46.63, 1_000.0)?;
//! assert_eq!(nearest.map(|s| s.id), Some(sensor.id));
//! # Ok::<(), telemetry_store::Error>(())
//! ```

mod error;
mod influx;
mod local;
mod measurements;
mod schema;
mod sensors;

pub use error::{Error, Result};
pub use influx::{InfluxConfig, InfluxMeasurementStore, build_flux, parse_annotated_csv};
pub use local::LocalMeasurementStore;
pub use measurements::{
    MeasurementStore, RESULT_COUNT, RESULT_MAX, RESULT_MEAN, RESULT_MEDIAN, RESULT_MIN,
    ResultRow, RowValue, SummaryAccumulator, SummaryQuery,
};
pub use sensors::SensorStore;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/telemetry/telemetry.db`
/// - macOS: `~/Library/Application Support/telemetry/telemetry.db`
/// - Windows: `C:\Users\<user>\AppData\Local\telemetry\telemetry.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("telemetry")
        .join("telemetry.db")
}
