//! Structured logging setup on top of `tracing`.
//!
//! Library code only emits events; hosts call [`init`] once to install a
//! subscriber. `RUST_LOG` takes precedence over the configured level, e.g.
//! `RUST_LOG=uplift_pacer::pacing=debug` to trace every controller update.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::EnvFilter;

/// Log output format.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable, for development.
    #[default]
    Pretty,
    /// JSON lines, for log aggregation.
    Json,
    /// Compact single-line format.
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format `{other}`")),
        }
    }
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed, which is not an
/// error for embedders that bring their own.
pub fn init(format: LogFormat, default_level: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let result = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init(),
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init(),
    };
    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("compact".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn second_init_is_tolerated() {
        let _ = init(LogFormat::Compact, "warn");
        assert!(!init(LogFormat::Json, "warn"));
    }
}
