//! Tracing setup for Kite PiloteV3 binaries.
//!
//! Maps the firmware's [`LogLevel`] onto a `tracing` level filter and
//! installs a `tracing_subscriber` fmt subscriber. Terminal output is
//! colorized per level (ERROR red, WARN yellow, INFO green, DEBUG blue);
//! JSON output is plain. `RUST_LOG` directives are honored on top of the
//! configured level.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use crate::config::LogLevel;

impl LogLevel {
    /// Equivalent `tracing` level filter. `None` turns logging off.
    pub const fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::None => LevelFilter::OFF,
            Self::Error => LevelFilter::ERROR,
            Self::Warning => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
        }
    }
}

/// Build the env filter used by [`init_tracing`].
pub fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::from_default_env().add_directive(level.as_level_filter().into())
}

/// Install the global tracing subscriber.
///
/// Safe to call more than once; only the first call takes effect.
pub fn init_tracing(level: LogLevel, json: bool) {
    let filter = env_filter(level);

    let result = if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .try_init()
    };

    let _ = result;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_filter_mapping() {
        assert_eq!(LogLevel::None.as_level_filter(), LevelFilter::OFF);
        assert_eq!(LogLevel::Error.as_level_filter(), LevelFilter::ERROR);
        assert_eq!(LogLevel::Warning.as_level_filter(), LevelFilter::WARN);
        assert_eq!(LogLevel::Info.as_level_filter(), LevelFilter::INFO);
        assert_eq!(LogLevel::Debug.as_level_filter(), LevelFilter::DEBUG);
    }

    #[test]
    fn init_twice_does_not_panic() {
        init_tracing(LogLevel::Debug, false);
        init_tracing(LogLevel::Error, true);
    }
}
