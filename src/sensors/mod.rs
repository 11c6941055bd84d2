pub mod service;

pub use service::{IngestOutcome, SensorService};
