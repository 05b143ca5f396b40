//! Measurement storage abstraction and summary aggregation.
//!
//! A summary is assembled from five named result streams (`mean`, `median`,
//! `count`, `min`, `max`). Every backend produces rows tagged with one of
//! those names and feeds them through a [`SummaryAccumulator`], so the local
//! and InfluxDB backends share the same merge rules.

use async_trait::async_trait;
use time::OffsetDateTime;

use telemetry_types::{Measurement, MeasurementSummary, NewMeasurement};

use crate::error::{Error, Result};

/// Result stream carrying the mean of the daily means.
pub const RESULT_MEAN: &str = "mean";
/// Result stream carrying the median of the daily medians.
pub const RESULT_MEDIAN: &str = "median";
/// Result stream carrying the number of matching samples.
pub const RESULT_COUNT: &str = "count";
/// Result stream carrying the minimum value.
pub const RESULT_MIN: &str = "min";
/// Result stream carrying the maximum value.
pub const RESULT_MAX: &str = "max";

/// Parameters of a summary query.
///
/// `start` is inclusive and `end` exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryQuery {
    pub sensor_id: String,
    /// Metric name.
    pub measurement: String,
    pub unit: String,
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl SummaryQuery {
    pub fn new(
        sensor_id: impl Into<String>,
        measurement: impl Into<String>,
        unit: impl Into<String>,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            measurement: measurement.into(),
            unit: unit.into(),
            start,
            end,
        }
    }

    /// Fails with [`Error::EmptyRange`] unless `start` is strictly before
    /// `end`.
    pub fn validate_range(&self) -> Result<()> {
        if self.start < self.end {
            Ok(())
        } else {
            Err(Error::EmptyRange {
                start: self.start,
                end: self.end,
            })
        }
    }
}

/// Storage for time-series measurements.
#[async_trait]
pub trait MeasurementStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Write a measurement stamped with the current UTC time.
    async fn create_measurement(&self, measurement: NewMeasurement) -> Result<Measurement>;

    /// Summarize one metric of one sensor over a time range.
    async fn get_measurement_summary(&self, query: &SummaryQuery) -> Result<MeasurementSummary>;

    /// Release the underlying connection or client.
    async fn close(&self) -> Result<()>;
}

/// A typed value in a result row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowValue {
    Float(f64),
    Integer(i64),
}

impl RowValue {
    fn type_name(&self) -> &'static str {
        match self {
            RowValue::Float(_) => "float",
            RowValue::Integer(_) => "integer",
        }
    }
}

/// One row of one result stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    /// Name of the stream the row belongs to.
    pub result: String,
    pub value: RowValue,
    pub unit: Option<String>,
}

impl ResultRow {
    pub fn float(result: &str, value: f64, unit: Option<&str>) -> Self {
        Self {
            result: result.to_string(),
            value: RowValue::Float(value),
            unit: unit.map(str::to_string),
        }
    }

    pub fn integer(result: &str, value: i64, unit: Option<&str>) -> Self {
        Self {
            result: result.to_string(),
            value: RowValue::Integer(value),
            unit: unit.map(str::to_string),
        }
    }
}

/// Folds result rows into a [`MeasurementSummary`].
///
/// The first row carrying a unit sets the summary unit. Fields whose stream
/// produced no row keep their default (zero) value.
#[derive(Debug, Default)]
pub struct SummaryAccumulator {
    summary: MeasurementSummary,
    unit_set: bool,
}

impl SummaryAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one row. Unknown stream names and mistyped values are errors.
    pub fn push(&mut self, row: ResultRow) -> Result<()> {
        let target = match row.result.as_str() {
            RESULT_MEAN => &mut self.summary.mean_value,
            RESULT_MEDIAN => &mut self.summary.median_value,
            RESULT_MIN => &mut self.summary.min_value,
            RESULT_MAX => &mut self.summary.max_value,
            RESULT_COUNT => {
                self.summary.count = match row.value {
                    RowValue::Integer(n) => u64::try_from(n)
                        .map_err(|_| Error::Query(format!("negative count: {n}")))?,
                    other => return Err(unexpected_type(&row.result, "integer", other)),
                };
                self.set_unit(row.unit);
                return Ok(());
            }
            other => return Err(Error::Query(format!("unexpected result stream: {other}"))),
        };

        *target = match row.value {
            RowValue::Float(v) => v,
            other => return Err(unexpected_type(&row.result, "float", other)),
        };
        self.set_unit(row.unit);
        Ok(())
    }

    fn set_unit(&mut self, unit: Option<String>) {
        if !self.unit_set
            && let Some(unit) = unit
        {
            self.summary.unit = unit;
            self.unit_set = true;
        }
    }

    /// Merge every row, stopping at the first error.
    pub fn extend<I: IntoIterator<Item = ResultRow>>(&mut self, rows: I) -> Result<()> {
        rows.into_iter().try_for_each(|row| self.push(row))
    }

    pub fn finish(self) -> MeasurementSummary {
        self.summary
    }
}

fn unexpected_type(result: &str, expected: &str, value: RowValue) -> Error {
    Error::Query(format!(
        "unexpected value type for {result}: expected {expected}, got {}",
        value.type_name()
    ))
}
