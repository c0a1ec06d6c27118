//! Kite PiloteV3 Common Library
//!
//! Shared constants, configuration loading, logging setup and module
//! enable flags for all Kite PiloteV3 workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Firmware-wide constants and compile-time module defaults
//! - [`config`] - Configuration loading traits and types
//! - [`logging`] - Tracing subscriber setup from a [`config::LogLevel`]
//! - [`modules`] - Module enable flags and their runtime switch record
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use kite_common::config::{ConfigLoader, SharedConfig};
//! use kite_common::modules::{ModuleSwitches, Modules};
//! ```

pub mod config;
pub mod consts;
pub mod logging;
pub mod modules;
pub mod prelude;
