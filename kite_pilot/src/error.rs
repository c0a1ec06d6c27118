//! Firmware startup errors.

use kite_common::config::ConfigError;
use kite_web::WebError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PilotError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Web(#[from] WebError),
}
