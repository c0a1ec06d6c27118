//! # Kite Pilot
//!
//! Composition root of the Kite PiloteV3 firmware. Owns the module
//! switches, the sample pool, the tick scheduler with its tasks, and the web
//! facade.
//!
//! ```text
//!            ┌──────────── ModuleSwitches ────────────┐
//!            │                                        │
//! Scheduler ─┼─ SensorTask ──► SampleQueue ──► TelemetryTask
//!            │      │  acquire            release  │
//!            │      └────────► SamplePool ◄─────────┘
//!            │
//! WebFacade ─┴─ StatusCache ◄── SystemStatus
//! ```

use std::sync::Arc;

use kite_core::clock::Clock;

pub mod app;
pub mod config;
pub mod error;
pub mod sample;
pub mod scheduler;
pub mod status;
pub mod tasks;

pub use app::{Pilot, TickStats, WebServer};
pub use config::PilotConfig;
pub use error::PilotError;

/// Clock shared by the scheduler, state machines and status cache.
pub type SharedClock = Arc<dyn Clock + Send + Sync>;
