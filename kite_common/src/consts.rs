//! Firmware-wide constants for the Kite PiloteV3 workspace.
//!
//! Single source of truth for numeric limits, default intervals and the
//! compile-time module enable defaults.

use static_assertions::const_assert;

/// Bounded wait for pool mutex acquisition [ms].
pub const POOL_LOCK_TIMEOUT_MS: u64 = 100;

/// Minimum interval between two renders of the system status string [ms].
pub const STATUS_REFRESH_MS: u32 = 1000;

/// Default HTTP port of the web facade on host builds.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default scheduler tick period [ms].
pub const TICK_PERIOD_MS: u32 = 10;

/// Sensor settling time after power-up before samples are taken [ms].
pub const SENSOR_WARMUP_MS: u32 = 200;

/// Time without a queued sample before the sensor task reports a stall [ms].
pub const SENSOR_STALE_TIMEOUT_MS: u32 = 500;

/// Number of pre-allocated sensor sample slots.
pub const SAMPLE_POOL_CAPACITY: usize = 16;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/kite_pilot/config.toml";

// ─── Module enable defaults ─────────────────────────────────────────

/// Web server enabled at boot.
pub const MODULE_WEBSERVER_ENABLED: bool = true;
/// WiFi link enabled at boot.
pub const MODULE_WIFI_ENABLED: bool = true;
/// Servo outputs enabled at boot.
pub const MODULE_SERVO_ENABLED: bool = false;
/// Display enabled at boot.
pub const MODULE_DISPLAY_ENABLED: bool = false;
/// JSON API enabled at boot.
pub const MODULE_API_ENABLED: bool = true;
/// Over-the-air update enabled at boot.
pub const MODULE_OTA_ENABLED: bool = false;
/// Telemetry logging enabled at boot.
pub const MODULE_LOGGING_ENABLED: bool = true;
/// Sensor sampling enabled at boot.
pub const MODULE_SENSORS_ENABLED: bool = true;
/// Autopilot enabled at boot.
pub const MODULE_AUTOPILOT_ENABLED: bool = false;
/// Winch enabled at boot.
pub const MODULE_WINCH_ENABLED: bool = false;

const_assert!(POOL_LOCK_TIMEOUT_MS > 0);
const_assert!(STATUS_REFRESH_MS > 0);
const_assert!(TICK_PERIOD_MS > 0);
const_assert!(SENSOR_STALE_TIMEOUT_MS > TICK_PERIOD_MS);
const_assert!(SAMPLE_POOL_CAPACITY > 0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_timeout_default_is_100ms() {
        assert_eq!(POOL_LOCK_TIMEOUT_MS, 100);
    }

    #[test]
    fn warmup_fits_inside_stale_window() {
        assert!(SENSOR_WARMUP_MS < SENSOR_STALE_TIMEOUT_MS);
    }
}
