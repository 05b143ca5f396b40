//! SQLite measurement backend.
//!
//! Samples are kept in the `measurements` table keyed by nanosecond
//! timestamps. Summaries are computed in process with the same daily
//! windowing the InfluxDB backend asks the server for.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use rusqlite::{Connection, params};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info};

use telemetry_types::{Measurement, MeasurementSummary, NewMeasurement};

use crate::error::{Error, Result};
use crate::measurements::{
    MeasurementStore, RESULT_COUNT, RESULT_MAX, RESULT_MEAN, RESULT_MEDIAN, RESULT_MIN,
    ResultRow, SummaryAccumulator, SummaryQuery,
};
use crate::schema;

const NANOS_PER_DAY: i64 = 86_400 * 1_000_000_000;

/// Measurement store backed by a local SQLite database.
pub struct LocalMeasurementStore {
    conn: Mutex<Option<Connection>>,
}

impl LocalMeasurementStore {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening measurement store at {}", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Insert an already stamped measurement.
    async fn write(&self, measurement: &Measurement) -> Result<()> {
        let timestamp_ns = to_nanos(measurement.timestamp)?;
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(Error::Closed)?;

        conn.execute(
            "INSERT INTO measurements (name, sensor_id, unit, value, timestamp_ns)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &measurement.name,
                &measurement.sensor_id,
                &measurement.unit,
                measurement.value,
                timestamp_ns,
            ],
        )?;
        Ok(())
    }

    /// Number of stored samples across all sensors.
    pub async fn count(&self) -> Result<u64> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(Error::Closed)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM measurements", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    async fn load_samples(&self, query: &SummaryQuery) -> Result<Vec<(i64, f64)>> {
        let start = to_nanos(query.start)?;
        let end = to_nanos(query.end)?;

        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(Error::Closed)?;

        let mut stmt = conn.prepare_cached(
            "SELECT timestamp_ns, value FROM measurements
             WHERE sensor_id = ?1 AND name = ?2 AND unit = ?3
               AND timestamp_ns >= ?4 AND timestamp_ns < ?5
             ORDER BY timestamp_ns",
        )?;
        let samples = stmt
            .query_map(
                params![&query.sensor_id, &query.measurement, &query.unit, start, end],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(samples)
    }
}

#[async_trait]
impl MeasurementStore for LocalMeasurementStore {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn create_measurement(&self, measurement: NewMeasurement) -> Result<Measurement> {
        let measurement = Measurement::stamped(measurement, OffsetDateTime::now_utc());
        self.write(&measurement).await?;
        debug!(
            "Stored {} for sensor {} at {}",
            measurement.name, measurement.sensor_id, measurement.timestamp
        );
        Ok(measurement)
    }

    async fn get_measurement_summary(&self, query: &SummaryQuery) -> Result<MeasurementSummary> {
        query.validate_range()?;

        let samples = self.load_samples(query).await?;
        debug!(
            "Summarizing {} samples of {} for sensor {}",
            samples.len(),
            query.measurement,
            query.sensor_id
        );

        let mut acc = SummaryAccumulator::new();
        acc.extend(summary_rows(&samples, &query.unit))?;
        Ok(acc.finish())
    }

    async fn close(&self) -> Result<()> {
        if let Some(conn) = self.conn.lock().await.take() {
            info!("Closing measurement store");
            conn.close().map_err(|(_, e)| Error::Database(e))?;
        }
        Ok(())
    }
}

fn to_nanos(timestamp: OffsetDateTime) -> Result<i64> {
    i64::try_from(timestamp.unix_timestamp_nanos())
        .map_err(|_| Error::InvalidInput(format!("timestamp out of range: {timestamp}")))
}

/// Produce the five result streams for time-ordered samples.
///
/// Nothing is produced for an empty slice.
fn summary_rows(samples: &[(i64, f64)], unit: &str) -> Vec<ResultRow> {
    if samples.is_empty() {
        return Vec::new();
    }

    let mut windows: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for &(timestamp_ns, value) in samples {
        windows
            .entry(timestamp_ns.div_euclid(NANOS_PER_DAY))
            .or_default()
            .push(value);
    }

    let daily_means: Vec<f64> = windows.values().map(|values| mean(values)).collect();
    let mut daily_medians: Vec<f64> = windows
        .into_values()
        .map(|mut values| median(&mut values))
        .collect();

    let values = samples.iter().map(|&(_, value)| value);
    let min = values.clone().fold(f64::INFINITY, f64::min);
    let max = values.fold(f64::NEG_INFINITY, f64::max);

    let unit = Some(unit);
    vec![
        ResultRow::float(RESULT_MEAN, mean(&daily_means), unit),
        ResultRow::float(RESULT_MEDIAN, median(&mut daily_medians), unit),
        ResultRow::integer(RESULT_COUNT, samples.len() as i64, unit),
        ResultRow::float(RESULT_MIN, min, unit),
        ResultRow::float(RESULT_MAX, max, unit),
    ]
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Exact median; the mean of the middle pair for even lengths.
fn median(values: &mut [f64]) -> f64 {
    values.sort_unstable_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
