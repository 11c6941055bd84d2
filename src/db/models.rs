use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One stored row of the `readings` table.
///
/// `id` is the only ordering authority; `timestamp` has second resolution
/// and follows the server's local clock, so it may repeat.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Reading {
    pub id: i64,
    /// Local server time at receipt, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    /// Degrees Fahrenheit
    pub air_temp_f: Option<f64>,
    /// Relative humidity percentage
    pub humidity: Option<f64>,
    pub lux: Option<f64>,
    /// Degrees Fahrenheit
    pub soil_temp_f: Option<f64>,
    /// Raw capacitive sensor value; lower is drier.
    pub soil_moisture: Option<i64>,
    pub batt_volts: Option<f64>,
    pub batt_pct: Option<f64>,
}

/// Field values for a row about to be inserted. Every value is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewReading {
    pub timestamp: String,
    pub air_temp_f: Option<f64>,
    pub humidity: Option<f64>,
    pub lux: Option<f64>,
    pub soil_temp_f: Option<f64>,
    pub soil_moisture: Option<i64>,
    pub batt_volts: Option<f64>,
    pub batt_pct: Option<f64>,
}

impl NewReading {
    pub fn stamped(timestamp: String, m: Measurements) -> Self {
        Self {
            timestamp,
            air_temp_f: m.air_temp_f,
            humidity: m.humidity,
            lux: m.lux,
            soil_temp_f: m.soil_temp_f,
            soil_moisture: m.soil_moisture,
            batt_volts: m.batt_volts,
            batt_pct: m.batt_pct,
        }
    }
}

/// Values reported by a device in one upload, before the server assigns a
/// timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measurements {
    pub air_temp_f: Option<f64>,
    pub humidity: Option<f64>,
    pub lux: Option<f64>,
    pub soil_temp_f: Option<f64>,
    pub soil_moisture: Option<i64>,
    pub batt_volts: Option<f64>,
    pub batt_pct: Option<f64>,
}

/// `chrono` format of `Reading::timestamp`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `chrono` format of the day prefix of `Reading::timestamp`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
