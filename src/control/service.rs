use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Raw soil-moisture reading below which the soil counts as dry.
pub const DEFAULT_DRY_THRESHOLD: i64 = 500;

/// Instruction returned to the device in the ingestion response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Command {
    /// Run the pump.
    Water,
    /// Nothing to do; go back to deep sleep.
    Sleep,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Command::Water => "WATER",
            Command::Sleep => "SLEEP",
        };
        f.write_str(s)
    }
}

/// Threshold-based watering decision.
///
/// Each call is evaluated on its own: there is no hysteresis and no minimum
/// interval between two `WATER` commands.
#[derive(Debug, Clone, Copy)]
pub struct ControlService {
    dry_threshold: i64,
}

impl Default for ControlService {
    fn default() -> Self {
        Self::new(DEFAULT_DRY_THRESHOLD)
    }
}

impl ControlService {
    pub fn new(dry_threshold: i64) -> Self {
        Self { dry_threshold }
    }

    pub fn dry_threshold(&self) -> i64 {
        self.dry_threshold
    }

    /// `WATER` only when a moisture value is present and strictly below the
    /// threshold. A missing value carries no signal and yields `SLEEP`.
    pub fn decide(&self, soil_moisture: Option<i64>) -> Command {
        match soil_moisture {
            Some(m) if m < self.dry_threshold => Command::Water,
            _ => Command::Sleep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn just_below_default_threshold_waters() {
        assert_eq!(ControlService::default().decide(Some(499)), Command::Water);
    }

    #[test]
    fn at_threshold_sleeps() {
        assert_eq!(ControlService::default().decide(Some(500)), Command::Sleep);
    }

    #[test]
    fn above_threshold_sleeps() {
        assert_eq!(ControlService::default().decide(Some(1015)), Command::Sleep);
    }

    #[test]
    fn missing_moisture_sleeps() {
        assert_eq!(ControlService::default().decide(None), Command::Sleep);
    }

    #[test]
    fn negative_raw_value_is_dry() {
        assert_eq!(ControlService::default().decide(Some(-1)), Command::Water);
    }

    #[test]
    fn custom_threshold_is_respected() {
        let control = ControlService::new(300);
        assert_eq!(control.dry_threshold(), 300);
        assert_eq!(control.decide(Some(299)), Command::Water);
        assert_eq!(control.decide(Some(300)), Command::Sleep);
        assert_eq!(control.decide(Some(499)), Command::Sleep);
    }

    #[test]
    fn command_serialises_uppercase() {
        assert_eq!(serde_json::to_string(&Command::Water).unwrap(), "\"WATER\"");
        assert_eq!(serde_json::to_string(&Command::Sleep).unwrap(), "\"SLEEP\"");
        assert_eq!(Command::Water.to_string(), "WATER");
    }
}
