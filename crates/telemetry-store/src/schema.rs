//! Database schema.
//!
//! Sensors and measurements share one schema so both stores can point at the
//! same SQLite file.

use rusqlite::Connection;

use crate::error::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Name of the index backing nearest-sensor queries.
pub const LOCATION_INDEX: &str = "idx_sensors_location";

/// Initialize the database schema.
pub fn initialize(conn: &Connection) -> Result<()> {
    let version = get_schema_version(conn)?;

    if version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    }

    Ok(())
}

/// Create the geospatial index on sensor locations.
///
/// Safe to call repeatedly.
pub fn ensure_location_index(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        "CREATE INDEX IF NOT EXISTS {} ON sensors(latitude, longitude);",
        LOCATION_INDEX
    ))?;
    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 =
        conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;

    Ok(version)
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
        [version],
    )?;
    Ok(())
}

/// Create the initial schema (version 1).
fn create_schema_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        -- Sensor documents; longitude/latitude duplicate the GeoJSON
        -- location so they can be indexed.
        CREATE TABLE IF NOT EXISTS sensors (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            location TEXT NOT NULL,
            longitude REAL NOT NULL,
            latitude REAL NOT NULL,
            tags TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sensors_name
            ON sensors(name, created_at);

        -- Append-only samples
        CREATE TABLE IF NOT EXISTS measurements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            sensor_id TEXT NOT NULL,
            unit TEXT NOT NULL,
            value REAL NOT NULL,
            timestamp_ns INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_measurements_series
            ON measurements(sensor_id, name, unit, timestamp_ns);
        "#,
    )?;

    Ok(())
}
