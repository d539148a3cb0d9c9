use std::path::Path;

use rusqlite::{params, Connection};

use crate::data_mgmt::models::Observation;
use crate::data_mgmt::normalize::SensorRegistry;
use crate::errors::PersistenceError;
use crate::helpers::TIMESTAMP_FORMAT;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sensors (
    name_raw TEXT PRIMARY KEY,
    sensor_id INTEGER NOT NULL,
    unit_scaling REAL
);
CREATE TABLE IF NOT EXISTS sensor_data (
    timestamp TEXT NOT NULL,
    sensor_id INTEGER NOT NULL,
    value REAL NOT NULL,
    PRIMARY KEY (timestamp, sensor_id)
);
";

const UPSERT_SQL: &str = "
INSERT INTO sensor_data (timestamp, sensor_id, value)
VALUES (?1, ?2, ?3)
ON CONFLICT (timestamp, sensor_id) DO UPDATE SET value = excluded.value
";

pub struct SensorStore {
    conn: Connection,
}

impl SensorStore {
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(SensorStore { conn })
    }

    pub fn sensor_registry(&self) -> Result<SensorRegistry, PersistenceError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name_raw, sensor_id, unit_scaling FROM sensors")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<f64>>(2)?,
            ))
        })?;

        let mut registry = SensorRegistry::new();
        for row in rows {
            let (name_raw, sensor_id, unit_scaling) = row?;
            registry.insert(name_raw, sensor_id, unit_scaling);
        }
        log::debug!("Loaded {} sensors from registry", registry.len());
        Ok(registry)
    }

    /// Write one batch of observations, replacing the stored value on
    /// (timestamp, sensor_id) conflicts. The batch is a single transaction.
    pub fn upsert(&mut self, observations: &[Observation]) -> Result<(), PersistenceError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(UPSERT_SQL)?;
            for obs in observations {
                stmt.execute(params![
                    obs.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    obs.sensor_id,
                    obs.value,
                ])?;
            }
        }
        tx.commit()?;
        log::info!("Upserted {} observations", observations.len());
        Ok(())
    }
}
