//! Subscriber setup for the `tracing` events emitted by the loaders

use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};
use crate::settings::Settings;

/// Map a configured level name onto a `tracing` filter directive.
///
/// Accepts the usual `tracing` names plus `WARNING` and `CRITICAL`, which
/// older configuration files still use.
pub fn level_directive(level: &str) -> Result<&'static str> {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Ok("trace"),
        "DEBUG" => Ok("debug"),
        "INFO" => Ok("info"),
        "WARN" | "WARNING" => Ok("warn"),
        "ERROR" | "CRITICAL" => Ok("error"),
        "OFF" => Ok("off"),
        other => Err(Error::Config(format!("unknown log level '{other}'"))),
    }
}

/// Install a global fmt subscriber filtered at the configured level.
///
/// `RUST_LOG` wins over `settings.log_level` when set. Returns `Ok(false)`
/// if a global subscriber was already installed.
pub fn init(settings: &Settings) -> Result<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(level_directive(&settings.log_level)?),
    };

    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("INFO", "info")]
    #[test_case("debug", "debug")]
    #[test_case("WARNING", "warn")]
    #[test_case("CRITICAL", "error")]
    #[test_case(" trace ", "trace")]
    fn test_level_directive(input: &str, expected: &str) {
        assert_eq!(level_directive(input).unwrap(), expected);
    }

    #[test]
    fn test_unknown_level_rejected() {
        assert!(level_directive("LOUD").is_err());
    }

    #[test]
    fn test_init_is_idempotent() {
        let settings = Settings::default();
        init(&settings).unwrap();
        assert!(!init(&settings).unwrap());
    }
}
