//! `kite_pilot` configuration file.
//!
//! ```toml
//! [shared]
//! service_name = "kite-01"
//! log_level = "info"
//!
//! [modules]
//! winch = true
//!
//! [pool]
//! lock_timeout_ms = 100
//!
//! [web]
//! port = 8080
//! use_files = false
//! status_refresh_ms = 1000
//!
//! [scheduler]
//! tick_ms = 10
//!
//! [sensors]
//! warmup_ms = 200
//! stale_timeout_ms = 500
//! ```
//!
//! Every table except `[shared]` is optional and falls back to the
//! compile-time defaults in [`kite_common::consts`].

use std::path::Path;
use std::time::Duration;

use kite_common::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
use kite_common::consts::{
    DEFAULT_SERVER_PORT, POOL_LOCK_TIMEOUT_MS, SENSOR_STALE_TIMEOUT_MS, SENSOR_WARMUP_MS,
    STATUS_REFRESH_MS, TICK_PERIOD_MS,
};
use kite_common::modules::ModulesConfig;
use serde::{Deserialize, Serialize};

/// Service name used when no configuration file is present.
pub const DEFAULT_SERVICE_NAME: &str = "kite-pilot";

// ─── Sections ───────────────────────────────────────────────────────

/// `[pool]`: sample pool tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// Bounded wait for the pool lock.
    pub lock_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: POOL_LOCK_TIMEOUT_MS,
        }
    }
}

impl PoolConfig {
    #[inline]
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

/// `[web]`: embedded HTTP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebConfig {
    /// Listening port. `0` picks a free port.
    pub port: u16,
    /// Request file-backed pages instead of generated ones.
    pub use_files: bool,
    /// Minimum interval between status string renderings.
    pub status_refresh_ms: u32,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERVER_PORT,
            use_files: false,
            status_refresh_ms: STATUS_REFRESH_MS,
        }
    }
}

/// `[scheduler]`: control tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    pub tick_ms: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_ms: TICK_PERIOD_MS,
        }
    }
}

/// `[sensors]`: sensor state machine timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorConfig {
    /// Time spent in `Warmup` before the first sample.
    pub warmup_ms: u32,
    /// Time without a queued sample before the sensor is `Stalled`.
    pub stale_timeout_ms: u32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            warmup_ms: SENSOR_WARMUP_MS,
            stale_timeout_ms: SENSOR_STALE_TIMEOUT_MS,
        }
    }
}

// ─── Top level ──────────────────────────────────────────────────────

/// Complete `kite_pilot` configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PilotConfig {
    pub shared: SharedConfig,
    #[serde(default)]
    pub modules: ModulesConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub sensors: SensorConfig,
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig {
                log_level: LogLevel::default(),
                service_name: DEFAULT_SERVICE_NAME.to_string(),
            },
            modules: ModulesConfig::default(),
            pool: PoolConfig::default(),
            web: WebConfig::default(),
            scheduler: SchedulerConfig::default(),
            sensors: SensorConfig::default(),
        }
    }
}

impl PilotConfig {
    /// Check parameter bounds.
    ///
    /// # Errors
    ///
    /// `ConfigError::ValidationError` naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        let zero = |key: &str| Err(ConfigError::ValidationError(format!("{key} must be > 0")));
        if self.pool.lock_timeout_ms == 0 {
            return zero("pool.lock_timeout_ms");
        }
        if self.web.status_refresh_ms == 0 {
            return zero("web.status_refresh_ms");
        }
        if self.scheduler.tick_ms == 0 {
            return zero("scheduler.tick_ms");
        }
        if self.sensors.stale_timeout_ms == 0 {
            return zero("sensors.stale_timeout_ms");
        }
        if self.sensors.stale_timeout_ms < self.scheduler.tick_ms {
            return Err(ConfigError::ValidationError(format!(
                "sensors.stale_timeout_ms ({}) is shorter than one tick ({} ms)",
                self.sensors.stale_timeout_ms, self.scheduler.tick_ms
            )));
        }
        Ok(())
    }

    /// Load and validate a configuration file.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    #[inline]
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(u64::from(self.scheduler.tick_ms))
    }
}
