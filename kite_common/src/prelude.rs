//! Prelude module for common re-exports.
//!
//! ```rust
//! use kite_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;
pub use crate::logging::init_tracing;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};

// ─── Module Flags ───────────────────────────────────────────────────
pub use crate::modules::{ModuleSwitches, Modules, ModulesConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{POOL_LOCK_TIMEOUT_MS, SAMPLE_POOL_CAPACITY, TICK_PERIOD_MS};

/// Default bounded wait for pool mutex acquisition as a `Duration`.
pub const DEFAULT_POOL_LOCK_TIMEOUT: Duration = Duration::from_millis(POOL_LOCK_TIMEOUT_MS);
