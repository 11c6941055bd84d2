use chrono::Local;
use tracing::{info, warn};

use crate::{
    control::{Command, ControlService},
    db::{
        models::{Measurements, NewReading, TIMESTAMP_FORMAT},
        ReadingStore, StorageError,
    },
};

/// Result of handling one device upload.
///
/// Persistence and the watering decision are independent: `command` is
/// computed from the request itself, whether or not `persisted` succeeded.
#[derive(Debug)]
pub struct IngestOutcome {
    /// Id of the stored row, or why it was dropped.
    pub persisted: Result<i64, StorageError>,
    pub command: Command,
}

#[derive(Debug, Clone)]
pub struct SensorService {
    store: ReadingStore,
    control: ControlService,
}

impl SensorService {
    pub fn new(store: ReadingStore, control: ControlService) -> Self {
        Self { store, control }
    }

    pub fn store(&self) -> &ReadingStore {
        &self.store
    }

    /// Stamps the reading with the local server time, appends it, and decides
    /// the command from the request's own `soil_moisture`.
    ///
    /// A failed append is reported in the outcome, never retried.
    pub async fn ingest(&self, measurements: Measurements) -> IngestOutcome {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();

        info!(
            timestamp = %timestamp,
            soil_moisture = ?measurements.soil_moisture,
            batt_pct = ?measurements.batt_pct,
            "Reading received"
        );

        let soil_moisture = measurements.soil_moisture;
        let persisted = self
            .store
            .append(&NewReading::stamped(timestamp, measurements))
            .await;

        let command = self.control.decide(soil_moisture);
        if command == Command::Water {
            warn!(
                soil_moisture = ?soil_moisture,
                dry_threshold = self.control.dry_threshold(),
                "Soil is dry; commanding WATER"
            );
        }

        IngestOutcome { persisted, command }
    }
}
