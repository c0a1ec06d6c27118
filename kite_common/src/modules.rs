//! Module enable flags.
//!
//! [`Modules`] names the firmware subsystems that can be switched on and
//! off. Boot defaults come from the `MODULE_*_ENABLED` constants in
//! [`crate::consts`] and may be overridden by the `[modules]` TOML table
//! ([`ModulesConfig`]). At runtime the composition root owns exactly one
//! [`ModuleSwitches`] and hands an `Arc` of it to every subsystem; a
//! disabled module's periodic tick is a no-op.

use std::sync::atomic::{AtomicU16, Ordering};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::consts::{
    MODULE_API_ENABLED, MODULE_AUTOPILOT_ENABLED, MODULE_DISPLAY_ENABLED, MODULE_LOGGING_ENABLED,
    MODULE_OTA_ENABLED, MODULE_SENSORS_ENABLED, MODULE_SERVO_ENABLED, MODULE_WEBSERVER_ENABLED,
    MODULE_WIFI_ENABLED, MODULE_WINCH_ENABLED,
};

bitflags! {
    /// Firmware subsystems that can be enabled or disabled.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modules: u16 {
        /// Embedded HTTP server.
        const WEBSERVER = 1 << 0;
        /// WiFi link.
        const WIFI      = 1 << 1;
        /// Servo outputs.
        const SERVO     = 1 << 2;
        /// Local display.
        const DISPLAY   = 1 << 3;
        /// JSON API.
        const API       = 1 << 4;
        /// Over-the-air updates.
        const OTA       = 1 << 5;
        /// Telemetry logging.
        const LOGGING   = 1 << 6;
        /// Sensor sampling.
        const SENSORS   = 1 << 7;
        /// Autopilot control loop.
        const AUTOPILOT = 1 << 8;
        /// Winch control.
        const WINCH     = 1 << 9;
    }
}

const fn enabled_if(flag: Modules, enabled: bool) -> Modules {
    if enabled { flag } else { Modules::empty() }
}

/// Compile-time boot defaults.
pub const DEFAULT_MODULES: Modules = enabled_if(Modules::WEBSERVER, MODULE_WEBSERVER_ENABLED)
    .union(enabled_if(Modules::WIFI, MODULE_WIFI_ENABLED))
    .union(enabled_if(Modules::SERVO, MODULE_SERVO_ENABLED))
    .union(enabled_if(Modules::DISPLAY, MODULE_DISPLAY_ENABLED))
    .union(enabled_if(Modules::API, MODULE_API_ENABLED))
    .union(enabled_if(Modules::OTA, MODULE_OTA_ENABLED))
    .union(enabled_if(Modules::LOGGING, MODULE_LOGGING_ENABLED))
    .union(enabled_if(Modules::SENSORS, MODULE_SENSORS_ENABLED))
    .union(enabled_if(Modules::AUTOPILOT, MODULE_AUTOPILOT_ENABLED))
    .union(enabled_if(Modules::WINCH, MODULE_WINCH_ENABLED));

impl Modules {
    /// Look up a single module by its lowercase name (`"sensors"`).
    pub fn from_lowercase_name(name: &str) -> Option<Self> {
        Self::all()
            .iter_names()
            .find(|(flag_name, _)| flag_name.eq_ignore_ascii_case(name))
            .map(|(_, flag)| flag)
    }

    /// Lowercase names of the modules in this set, in bit order.
    pub fn lowercase_names(self) -> impl Iterator<Item = String> {
        self.iter_names().map(|(name, _)| name.to_ascii_lowercase())
    }
}

/// `[modules]` TOML table: one boolean per subsystem.
///
/// Missing keys fall back to the compile-time defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModulesConfig {
    pub webserver: bool,
    pub wifi: bool,
    pub servo: bool,
    pub display: bool,
    pub api: bool,
    pub ota: bool,
    pub logging: bool,
    pub sensors: bool,
    pub autopilot: bool,
    pub winch: bool,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            webserver: MODULE_WEBSERVER_ENABLED,
            wifi: MODULE_WIFI_ENABLED,
            servo: MODULE_SERVO_ENABLED,
            display: MODULE_DISPLAY_ENABLED,
            api: MODULE_API_ENABLED,
            ota: MODULE_OTA_ENABLED,
            logging: MODULE_LOGGING_ENABLED,
            sensors: MODULE_SENSORS_ENABLED,
            autopilot: MODULE_AUTOPILOT_ENABLED,
            winch: MODULE_WINCH_ENABLED,
        }
    }
}

impl From<ModulesConfig> for Modules {
    fn from(cfg: ModulesConfig) -> Self {
        enabled_if(Modules::WEBSERVER, cfg.webserver)
            | enabled_if(Modules::WIFI, cfg.wifi)
            | enabled_if(Modules::SERVO, cfg.servo)
            | enabled_if(Modules::DISPLAY, cfg.display)
            | enabled_if(Modules::API, cfg.api)
            | enabled_if(Modules::OTA, cfg.ota)
            | enabled_if(Modules::LOGGING, cfg.logging)
            | enabled_if(Modules::SENSORS, cfg.sensors)
            | enabled_if(Modules::AUTOPILOT, cfg.autopilot)
            | enabled_if(Modules::WINCH, cfg.winch)
    }
}

/// Runtime module switch record.
///
/// Reads and writes are single-word atomics, so any task may observe or
/// flip a switch without taking a lock.
#[derive(Debug)]
pub struct ModuleSwitches {
    bits: AtomicU16,
}

impl ModuleSwitches {
    /// Create the record with the given modules enabled.
    pub const fn new(initial: Modules) -> Self {
        Self {
            bits: AtomicU16::new(initial.bits()),
        }
    }

    /// True if every module in `modules` is enabled.
    #[inline]
    pub fn is_enabled(&self, modules: Modules) -> bool {
        self.snapshot().contains(modules)
    }

    /// Enable or disable `modules`. Returns the previous set.
    pub fn set(&self, modules: Modules, enabled: bool) -> Modules {
        let previous = if enabled {
            self.bits.fetch_or(modules.bits(), Ordering::Relaxed)
        } else {
            self.bits.fetch_and(!modules.bits(), Ordering::Relaxed)
        };
        Modules::from_bits_truncate(previous)
    }

    /// Currently enabled modules.
    #[inline]
    pub fn snapshot(&self) -> Modules {
        Modules::from_bits_truncate(self.bits.load(Ordering::Relaxed))
    }
}

impl Default for ModuleSwitches {
    fn default() -> Self {
        Self::new(DEFAULT_MODULES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_compile_time_constants() {
        assert_eq!(Modules::from(ModulesConfig::default()), DEFAULT_MODULES);
        assert_eq!(
            DEFAULT_MODULES.contains(Modules::WEBSERVER),
            MODULE_WEBSERVER_ENABLED
        );
        assert_eq!(DEFAULT_MODULES.contains(Modules::WINCH), MODULE_WINCH_ENABLED);
    }

    #[test]
    fn ten_distinct_modules() {
        assert_eq!(Modules::all().iter().count(), 10);
    }

    #[test]
    fn name_lookup_is_case_insensitive() {
        assert_eq!(Modules::from_lowercase_name("sensors"), Some(Modules::SENSORS));
        assert_eq!(Modules::from_lowercase_name("WINCH"), Some(Modules::WINCH));
        assert_eq!(Modules::from_lowercase_name("radar"), None);
    }

    #[test]
    fn lowercase_names_in_bit_order() {
        let names: Vec<String> = (Modules::WIFI | Modules::WEBSERVER).lowercase_names().collect();
        assert_eq!(names, vec!["webserver".to_string(), "wifi".to_string()]);
    }

    #[test]
    fn switches_toggle_at_runtime() {
        let switches = ModuleSwitches::new(Modules::SENSORS);
        assert!(switches.is_enabled(Modules::SENSORS));
        assert!(!switches.is_enabled(Modules::LOGGING));

        let previous = switches.set(Modules::LOGGING, true);
        assert_eq!(previous, Modules::SENSORS);
        assert!(switches.is_enabled(Modules::SENSORS | Modules::LOGGING));

        switches.set(Modules::SENSORS, false);
        assert_eq!(switches.snapshot(), Modules::LOGGING);
    }

    #[test]
    fn modules_table_partial_override() {
        let cfg: ModulesConfig = toml::from_str("winch = true\nwifi = false\n").unwrap();
        let modules = Modules::from(cfg);
        assert!(modules.contains(Modules::WINCH));
        assert!(!modules.contains(Modules::WIFI));
        assert_eq!(
            modules.contains(Modules::SENSORS),
            MODULE_SENSORS_ENABLED
        );
    }

    #[test]
    fn modules_table_rejects_unknown_key() {
        assert!(toml::from_str::<ModulesConfig>("radar = true\n").is_err());
    }
}
