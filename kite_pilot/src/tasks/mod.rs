//! Periodic firmware tasks.
//!
//! - [`sensors::SensorTask`] (`sensors` module): samples the IMU into pooled slots
//! - [`telemetry::TelemetryTask`] (`logging` module): folds queued samples into
//!   the telemetry snapshot and returns the slots

pub mod sensors;
pub mod telemetry;

pub use sensors::{SensorCounters, SensorFsm, SensorShared, SensorState, SensorTask};
pub use telemetry::{SharedTelemetry, Telemetry, TelemetryTask};
