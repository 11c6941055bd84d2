pub mod service;

pub use service::{Command, ControlService, DEFAULT_DRY_THRESHOLD};
