//! Sensor registry with nearest-neighbor lookup.

use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use time::OffsetDateTime;
use tracing::{debug, info};

use telemetry_types::{EARTH_RADIUS_METERS, GeoPoint, NewSensor, Sensor, SensorId};

use crate::error::{Error, Result};
use crate::schema;

const SELECT_SENSOR: &str = "SELECT id, name, location, tags FROM sensors";

/// SQLite-backed sensor store.
pub struct SensorStore {
    conn: Connection,
}

impl SensorStore {
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

        info!("Opening sensor store at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        schema::initialize(&conn)?;
        schema::ensure_location_index(&conn)?;
        Ok(Self { conn })
    }

    /// Persist a new sensor under a freshly generated identifier.
    pub fn create_sensor(&self, sensor: NewSensor) -> Result<Sensor> {
        let sensor = Sensor::from_new(SensorId::new(), sensor);
        let location = serde_json::to_string(&sensor.location)?;
        let tags = serde_json::to_string(&sensor.tags)?;

        self.conn.execute(
            "INSERT INTO sensors (id, name, location, longitude, latitude, tags, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                sensor.id.to_string(),
                &sensor.name,
                location,
                sensor.location.longitude(),
                sensor.location.latitude(),
                tags,
                now_nanos(),
            ],
        )?;

        debug!("Created sensor {} ({})", sensor.id, sensor.name);
        Ok(sensor)
    }

    /// Get a sensor by its identifier.
    ///
    /// Fails with [`Error::InvalidId`] before touching the database when `id`
    /// is not a well-formed identifier.
    pub fn get_sensor_by_id(&self, id: &str) -> Result<Sensor> {
        let id: SensorId = id.parse()?;

        self.conn
            .query_row(
                &format!("{SELECT_SENSOR} WHERE id = ?1"),
                [id.to_string()],
                sensor_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("sensor {id}")))
    }

    /// Get the earliest-created sensor with the given name.
    pub fn get_sensor_by_name(&self, name: &str) -> Result<Sensor> {
        self.conn
            .query_row(
                &format!("{SELECT_SENSOR} WHERE name = ?1 ORDER BY created_at, rowid LIMIT 1"),
                [name],
                sensor_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("sensor named {name:?}")))
    }

    /// Find the sensor closest to a point, within `max_distance` meters.
    ///
    /// Returns `Ok(None)` when no sensor is in range.
    pub fn get_nearest_sensor(
        &self,
        latitude: f64,
        longitude: f64,
        max_distance: f64,
    ) -> Result<Option<Sensor>> {
        let origin = GeoPoint::new(longitude, latitude);
        if !origin.is_valid() {
            return Err(Error::InvalidInput(format!(
                "coordinates out of range: latitude {latitude}, longitude {longitude}"
            )));
        }
        if !max_distance.is_finite() || max_distance < 0.0 {
            return Err(Error::InvalidInput(format!(
                "max distance must be a non-negative number of meters, got {max_distance}"
            )));
        }

        let bounds = BoundingBox::around(&origin, max_distance);
        debug!("Nearest sensor search within {max_distance} m using {bounds:?}");

        let mut sql = format!("{SELECT_SENSOR} WHERE latitude BETWEEN ?1 AND ?2");
        if bounds.longitude.is_some() {
            sql.push_str(" AND longitude BETWEEN ?3 AND ?4");
        }
        let (min_lon, max_lon) = bounds.longitude.unwrap_or((-180.0, 180.0));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = if bounds.longitude.is_some() {
            stmt.query_map(
                params![bounds.min_lat, bounds.max_lat, min_lon, max_lon],
                sensor_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            stmt.query_map(params![bounds.min_lat, bounds.max_lat], sensor_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        };

        let nearest = rows
            .into_iter()
            .map(|sensor| (origin.distance_to(&sensor.location), sensor))
            .filter(|(distance, _)| *distance <= max_distance)
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, sensor)| sensor);

        Ok(nearest)
    }

    /// Replace a sensor's name, location and tags.
    ///
    /// The identifier is kept. Fails with [`Error::NotFound`] when no sensor
    /// has the given id.
    pub fn update_sensor(&self, id: &str, sensor: NewSensor) -> Result<Sensor> {
        let id: SensorId = id.parse()?;
        let location = serde_json::to_string(&sensor.location)?;
        let tags = serde_json::to_string(&sensor.tags)?;

        let changed = self.conn.execute(
            "UPDATE sensors SET name = ?2, location = ?3, longitude = ?4, latitude = ?5, tags = ?6
             WHERE id = ?1",
            params![
                id.to_string(),
                &sensor.name,
                location,
                sensor.location.longitude(),
                sensor.location.latitude(),
                tags,
            ],
        )?;

        if changed == 0 {
            return Err(Error::NotFound(format!("sensor {id}")));
        }

        debug!("Updated sensor {id}");
        Ok(Sensor::from_new(id, sensor))
    }

    /// Number of registered sensors.
    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sensors", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Close the underlying connection.
    pub fn close(self) -> Result<()> {
        info!("Closing sensor store");
        self.conn.close().map_err(|(_, e)| Error::Database(e))
    }
}

/// Latitude/longitude window that contains every point within a distance of
/// an origin.
///
/// `longitude` is `None` when the window crosses a pole or the antimeridian,
/// in which case every longitude must be scanned.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BoundingBox {
    min_lat: f64,
    max_lat: f64,
    longitude: Option<(f64, f64)>,
}

impl BoundingBox {
    fn around(origin: &GeoPoint, distance: f64) -> Self {
        let angular = distance / EARTH_RADIUS_METERS;
        let lat = origin.latitude().to_radians();
        let lon = origin.longitude().to_radians();

        let min_lat = lat - angular;
        let max_lat = lat + angular;

        let half_pi = std::f64::consts::FRAC_PI_2;
        if min_lat <= -half_pi || max_lat >= half_pi {
            return Self {
                min_lat: min_lat.max(-half_pi).to_degrees(),
                max_lat: max_lat.min(half_pi).to_degrees(),
                longitude: None,
            };
        }

        let delta_lon = (angular.sin() / lat.cos()).asin();
        let min_lon = lon - delta_lon;
        let max_lon = lon + delta_lon;
        let pi = std::f64::consts::PI;

        let longitude = (min_lon >= -pi && max_lon <= pi)
            .then(|| (min_lon.to_degrees(), max_lon.to_degrees()));

        Self {
            min_lat: min_lat.to_degrees(),
            max_lat: max_lat.to_degrees(),
            longitude,
        }
    }
}

fn now_nanos() -> i64 {
    i64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos()).unwrap_or(i64::MAX)
}

fn sensor_from_row(row: &Row<'_>) -> rusqlite::Result<Sensor> {
    let id: String = row.get(0)?;
    let location: String = row.get(2)?;
    let tags: String = row.get(3)?;

    Ok(Sensor {
        id: id
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?,
        name: row.get(1)?,
        location: serde_json::from_str(&location)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
        tags: serde_json::from_str(&tags)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
    })
}
