use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    control::Command,
    db::models::{Measurements, Reading, DATE_FORMAT},
};

/// Body of `POST /api/data`. Every key is optional; unknown keys are ignored
/// and `null` is the same as an absent key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct IngestRequest {
    /// Degrees Fahrenheit
    #[serde(default)]
    pub air_temp_f: Option<f64>,
    /// Relative humidity percentage
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub lux: Option<f64>,
    /// Degrees Fahrenheit
    #[serde(default)]
    pub soil_temp_f: Option<f64>,
    /// Raw sensor value; lower is drier.
    #[serde(default)]
    pub soil_moisture: Option<i64>,
    #[serde(default)]
    pub batt_volts: Option<f64>,
    #[serde(default)]
    pub batt_pct: Option<f64>,
}

impl From<IngestRequest> for Measurements {
    fn from(r: IngestRequest) -> Self {
        Self {
            air_temp_f: r.air_temp_f,
            humidity: r.humidity,
            lux: r.lux,
            soil_temp_f: r.soil_temp_f,
            soil_moisture: r.soil_moisture,
            batt_volts: r.batt_volts,
            batt_pct: r.batt_pct,
        }
    }
}

/// Response to `POST /api/data`. `status` is always `"success"`; storage
/// failures are only visible in the server log.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestResponse {
    pub status: String,
    pub command: Command,
}

impl IngestResponse {
    pub fn success(command: Command) -> Self {
        Self {
            status: "success".to_owned(),
            command,
        }
    }
}

/// One reading as served by `/api/latest` and `/api/history`. Missing values
/// are serialised as `null`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadingDto {
    /// Local server time at receipt, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    pub air_temp_f: Option<f64>,
    pub humidity: Option<f64>,
    pub lux: Option<f64>,
    pub soil_moisture: Option<i64>,
    pub soil_temp_f: Option<f64>,
    pub batt_volts: Option<f64>,
    pub batt_pct: Option<f64>,
}

impl From<Reading> for ReadingDto {
    fn from(r: Reading) -> Self {
        Self {
            timestamp: r.timestamp,
            air_temp_f: r.air_temp_f,
            humidity: r.humidity,
            lux: r.lux,
            soil_moisture: r.soil_moisture,
            soil_temp_f: r.soil_temp_f,
            batt_volts: r.batt_volts,
            batt_pct: r.batt_pct,
        }
    }
}

/// Value of `?date=` that selects every stored reading.
pub const ALL_TIME: &str = "All Time";

/// Query of `GET /api/history_by_date`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryByDateParams {
    /// A `YYYY-MM-DD` day, or `All Time`. Omitted means `All Time`.
    pub date: Option<String>,
}

impl HistoryByDateParams {
    /// `None` selects every reading.
    pub fn day(&self) -> anyhow::Result<Option<NaiveDate>> {
        match self.date.as_deref().map(str::trim) {
            None | Some("") | Some(ALL_TIME) => Ok(None),
            Some(raw) => NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map(Some)
                .with_context(|| format!("date must be YYYY-MM-DD or {ALL_TIME:?}, got {raw:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn ingest_request_accepts_any_subset() {
        let req: IngestRequest =
            serde_json::from_value(json!({ "soil_moisture": 300, "batt_pct": 42.5 })).unwrap();
        assert_eq!(req.soil_moisture, Some(300));
        assert_eq!(req.batt_pct, Some(42.5));
        assert_eq!(req.air_temp_f, None);
        assert_eq!(req.batt_volts, None);
    }

    #[test]
    fn ingest_request_treats_null_as_absent_and_ignores_unknown_keys() {
        let req: IngestRequest =
            serde_json::from_value(json!({ "soil_moisture": null, "firmware": "1.2" })).unwrap();
        assert_eq!(req, IngestRequest::default());
    }

    #[test]
    fn ingest_request_rejects_fractional_moisture() {
        let res = serde_json::from_value::<IngestRequest>(json!({ "soil_moisture": 300.5 }));
        assert!(res.is_err());
    }

    #[test]
    fn ingest_request_converts_field_by_field() {
        let req = IngestRequest {
            air_temp_f: Some(70.2),
            soil_moisture: Some(455),
            batt_volts: Some(3.71),
            ..Default::default()
        };
        assert_eq!(
            Measurements::from(req),
            Measurements {
                air_temp_f: Some(70.2),
                soil_moisture: Some(455),
                batt_volts: Some(3.71),
                ..Default::default()
            }
        );
    }

    fn params(date: Option<&str>) -> HistoryByDateParams {
        HistoryByDateParams {
            date: date.map(str::to_owned),
        }
    }

    #[test]
    fn history_by_date_params_all_time_variants() {
        assert_eq!(params(None).day().unwrap(), None);
        assert_eq!(params(Some("All Time")).day().unwrap(), None);
        assert_eq!(params(Some("")).day().unwrap(), None);
    }

    #[test]
    fn history_by_date_params_parses_a_day() {
        assert_eq!(
            params(Some("2025-12-23")).day().unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 23)
        );
    }

    #[test]
    fn history_by_date_params_rejects_other_formats() {
        for bad in ["23/12/2025", "2025-13-01", "yesterday", "2025-12-23%"] {
            let err = params(Some(bad)).day().unwrap_err();
            assert!(err.to_string().contains("YYYY-MM-DD"), "{bad}");
        }
    }

    #[test]
    fn reading_dto_serialises_missing_values_as_null() {
        let dto = ReadingDto::from(Reading {
            id: 7,
            timestamp: "2024-05-01 08:30:15".to_owned(),
            air_temp_f: None,
            humidity: None,
            lux: Some(15.0),
            soil_temp_f: None,
            soil_moisture: None,
            batt_volts: None,
            batt_pct: None,
        });

        let value = serde_json::to_value(dto).unwrap();
        assert_eq!(
            value,
            json!({
                "timestamp": "2024-05-01 08:30:15",
                "air_temp_f": null,
                "humidity": null,
                "lux": 15.0,
                "soil_moisture": null,
                "soil_temp_f": null,
                "batt_volts": null,
                "batt_pct": null,
            })
        );
    }
}
