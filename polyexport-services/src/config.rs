//! Export configuration

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use polyexport_core::{ExportError, ExportResult};
use polyexport_polymarket::types::{CLOB_API_BASE, GAMMA_API_BASE};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Number of markets shown in the panel preview
pub const DEFAULT_PREVIEW_LIMIT: usize = 8;

/// Longest price history window accepted, in days
pub const MAX_LOOKBACK_DAYS: u32 = 36_500;

/// Configuration for an export run
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// Gamma API host (event listing)
    pub gamma_base_url: String,
    /// CLOB API host (price history)
    pub clob_base_url: String,
    /// Granularity of price history points, in minutes
    pub fidelity_minutes: u32,
    /// How far back price history starts when `start_ts` is unset
    pub lookback_days: u32,
    /// Explicit unix start timestamp (seconds) for price history
    pub start_ts: Option<i64>,
    /// Pause before every price history request, in milliseconds
    pub request_delay_ms: u64,
    /// Directory the CSV files are written to
    pub output_dir: PathBuf,
    /// Number of markets shown in the panel preview
    pub preview_limit: usize,
    /// HTTP request timeout, in seconds
    pub http_timeout_secs: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            gamma_base_url: GAMMA_API_BASE.to_string(),
            clob_base_url: CLOB_API_BASE.to_string(),
            fidelity_minutes: 60,
            lookback_days: 30,
            start_ts: None,
            request_delay_ms: 300,
            output_dir: PathBuf::from("."),
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            http_timeout_secs: 30,
        }
    }
}

impl ExportConfig {
    /// Load configuration from environment variables
    ///
    /// Every variable is optional and falls back to the default:
    /// - POLYEXPORT_GAMMA_URL, POLYEXPORT_CLOB_URL: API hosts
    /// - POLYEXPORT_FIDELITY: price history granularity in minutes
    /// - POLYEXPORT_LOOKBACK_DAYS: history window when no start is given
    /// - POLYEXPORT_START_TS: explicit unix start timestamp
    /// - POLYEXPORT_DELAY_MS: pause before each price history request
    /// - POLYEXPORT_OUT_DIR: output directory
    /// - POLYEXPORT_HTTP_TIMEOUT: request timeout in seconds
    pub fn from_env() -> ExportResult<Self> {
        let defaults = Self::default();

        Ok(Self {
            gamma_base_url: env::var("POLYEXPORT_GAMMA_URL").unwrap_or(defaults.gamma_base_url),
            clob_base_url: env::var("POLYEXPORT_CLOB_URL").unwrap_or(defaults.clob_base_url),
            fidelity_minutes: env_parse("POLYEXPORT_FIDELITY")?
                .unwrap_or(defaults.fidelity_minutes),
            lookback_days: env_parse("POLYEXPORT_LOOKBACK_DAYS")?
                .unwrap_or(defaults.lookback_days),
            start_ts: env_parse("POLYEXPORT_START_TS")?,
            request_delay_ms: env_parse("POLYEXPORT_DELAY_MS")?
                .unwrap_or(defaults.request_delay_ms),
            output_dir: env::var("POLYEXPORT_OUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            preview_limit: defaults.preview_limit,
            http_timeout_secs: env_parse("POLYEXPORT_HTTP_TIMEOUT")?
                .unwrap_or(defaults.http_timeout_secs),
        })
    }

    /// Check values that would make a run meaningless
    pub fn validate(&self) -> ExportResult<()> {
        if self.fidelity_minutes == 0 {
            return Err(ExportError::config("fidelity must be at least 1 minute"));
        }
        if self.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(ExportError::config(format!(
                "lookback of {} days exceeds the {} day limit",
                self.lookback_days, MAX_LOOKBACK_DAYS
            )));
        }
        if self.http_timeout_secs == 0 {
            return Err(ExportError::config("HTTP timeout must be at least 1 second"));
        }
        Ok(())
    }

    /// Start of the price history window
    pub fn start_timestamp(&self, now: DateTime<Utc>) -> ExportResult<i64> {
        if let Some(start_ts) = self.start_ts {
            return Ok(start_ts);
        }

        ChronoDuration::try_days(i64::from(self.lookback_days))
            .and_then(|window| now.checked_sub_signed(window))
            .map(|start| start.timestamp())
            .ok_or_else(|| {
                ExportError::config(format!(
                    "lookback of {} days is out of range",
                    self.lookback_days
                ))
            })
    }

    /// Pause before each price history request
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn env_parse<T>(name: &str) -> ExportResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ExportError::config(format!("{}={:?}: {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}
