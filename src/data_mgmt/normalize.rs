use std::collections::HashMap;

use crate::data_mgmt::models::{Observation, TimeSeriesTable};
use crate::errors::ConfigError;

/// Per-sensor metadata from the registry table. The registry is maintained
/// out-of-band and read-only here.
#[derive(Clone, Copy, Debug)]
pub struct SensorInfo {
    pub sensor_id: i64,
    pub unit_scaling: f64,
}

#[derive(Clone, Debug, Default)]
pub struct SensorRegistry {
    sensors: HashMap<String, SensorInfo>,
}

impl SensorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A missing or NaN scaling factor means "store as-is".
    pub fn insert(&mut self, name_raw: String, sensor_id: i64, unit_scaling: Option<f64>) {
        let unit_scaling = match unit_scaling {
            Some(s) if s.is_finite() => s,
            _ => 1.0,
        };
        self.sensors.insert(
            name_raw,
            SensorInfo {
                sensor_id,
                unit_scaling,
            },
        );
    }

    pub fn get(&self, name_raw: &str) -> Option<&SensorInfo> {
        self.sensors.get(name_raw)
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Reshape a wide table into long-form observations: apply each column's
/// unit scaling, drop missing cells, round to 3 decimal places. A column
/// with no registry entry indicates registry/adapter drift and fails the
/// whole batch before anything is emitted.
pub fn normalize(
    table: &TimeSeriesTable,
    registry: &SensorRegistry,
) -> Result<Vec<Observation>, ConfigError> {
    let sensors: Vec<&SensorInfo> = table
        .columns()
        .iter()
        .map(|col| {
            registry
                .get(col)
                .ok_or_else(|| ConfigError::UnmappedSensor(col.clone()))
        })
        .collect::<Result<_, _>>()?;

    let mut observations = Vec::new();
    for (timestamp, cells) in table.rows() {
        for (sensor, cell) in sensors.iter().zip(cells) {
            if let Some(value) = cell {
                observations.push(Observation {
                    timestamp: *timestamp,
                    sensor_id: sensor.sensor_id,
                    value: round3(value * sensor.unit_scaling),
                });
            }
        }
    }
    Ok(observations)
}
