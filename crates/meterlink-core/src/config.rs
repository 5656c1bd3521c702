use chrono::NaiveDateTime;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// 24 hours in milliseconds — the default for both the lookback window and
/// the upload interval.
pub const TWENTY_FOUR_HOURS_MS: i64 = 1000 * 60 * 60 * 24;

/// Built-in ingestion endpoint used when the host does not override it.
pub const DEFAULT_INGEST_URL: &str = "https://ingest.meterlink.io/import";

/// Anchor used when `first_upload_date` is not configured.
pub const DEFAULT_FIRST_UPLOAD_DATE: &str = "2015-01-01 00:00:00";

/// Format accepted for `first_upload_date` (interpreted as UTC).
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Component configuration (meterlink.toml + METERLINK_* env overrides).
///
/// All durations are plain integer milliseconds, matching what hosts already
/// store for logging intervals. `first_upload_date` is the schedule anchor:
/// runs are phase-locked to it, so an anchor of midnight with an interval
/// that divides 24h lands every run on a predictable wall-clock boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterlinkConfig {
    /// Ingestion endpoint account name. Required, non-empty.
    #[serde(default)]
    pub username: String,

    /// Ingestion endpoint password. Required, non-empty.
    #[serde(default)]
    pub password: String,

    /// Lookback window per run, in milliseconds. Must be > 0.
    #[serde(default = "default_duration_ms")]
    pub data_range_ms: i64,

    /// Interval between runs, in milliseconds. Must be > 0.
    #[serde(default = "default_duration_ms")]
    pub upload_interval_ms: i64,

    /// Schedule anchor, `YYYY-MM-DD HH:MM:SS` in UTC.
    #[serde(default = "default_first_upload_date")]
    pub first_upload_date: String,

    /// Ingestion endpoint URL.
    #[serde(default = "default_ingest_url")]
    pub ingest_url: String,

    /// Channel that receives the boolean health flag after each run.
    /// Absent means status writes are skipped.
    #[serde(default)]
    pub report_error_channel_id: Option<String>,

    /// Forwarded to the transport; the core does not interpret it.
    #[serde(default = "bool_true")]
    pub delete_file_after_upload: bool,
}

impl Default for MeterlinkConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            data_range_ms: TWENTY_FOUR_HOURS_MS,
            upload_interval_ms: TWENTY_FOUR_HOURS_MS,
            first_upload_date: DEFAULT_FIRST_UPLOAD_DATE.to_string(),
            ingest_url: DEFAULT_INGEST_URL.to_string(),
            report_error_channel_id: None,
            delete_file_after_upload: true,
        }
    }
}

impl MeterlinkConfig {
    /// Load config from a TOML file with METERLINK_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ./meterlink.toml
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path.unwrap_or("meterlink.toml");

        let config: MeterlinkConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("METERLINK_"))
            .extract()
            .map_err(|e| ConfigError::Source(e.to_string()))?;

        Ok(config)
    }

    /// Check all invariants the scheduler and upload task rely on.
    ///
    /// Called before any timer is armed; an invalid configuration leaves the
    /// component idle rather than half-scheduled.
    pub fn validate(&self) -> Result<()> {
        if self.username.is_empty() {
            return Err(ConfigError::EmptyField("username"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::EmptyField("password"));
        }
        if self.data_range_ms <= 0 {
            return Err(ConfigError::InvalidNumber {
                field: "data_range_ms",
                reason: format!("must be > 0, got {}", self.data_range_ms),
            });
        }
        if self.upload_interval_ms <= 0 {
            return Err(ConfigError::InvalidNumber {
                field: "upload_interval_ms",
                reason: format!("must be > 0, got {}", self.upload_interval_ms),
            });
        }
        self.anchor_ms()?;
        Ok(())
    }

    /// Parse `first_upload_date` into epoch milliseconds (UTC).
    pub fn anchor_ms(&self) -> Result<i64> {
        let parsed = NaiveDateTime::parse_from_str(&self.first_upload_date, DATE_FORMAT)
            .map_err(|e| ConfigError::InvalidDate {
                field: "first_upload_date",
                reason: e.to_string(),
            })?;
        Ok(parsed.and_utc().timestamp_millis())
    }
}

fn default_duration_ms() -> i64 {
    TWENTY_FOUR_HOURS_MS
}

fn default_first_upload_date() -> String {
    DEFAULT_FIRST_UPLOAD_DATE.to_string()
}

fn default_ingest_url() -> String {
    DEFAULT_INGEST_URL.to_string()
}

fn bool_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> MeterlinkConfig {
        MeterlinkConfig {
            username: "acct".into(),
            password: "secret".into(),
            ..MeterlinkConfig::default()
        }
    }

    #[test]
    fn defaults_are_24h() {
        let config = MeterlinkConfig::default();
        assert_eq!(config.data_range_ms, TWENTY_FOUR_HOURS_MS);
        assert_eq!(config.upload_interval_ms, TWENTY_FOUR_HOURS_MS);
        assert_eq!(config.ingest_url, DEFAULT_INGEST_URL);
        assert!(config.delete_file_after_upload);
        assert!(config.report_error_channel_id.is_none());
    }

    #[test]
    fn empty_credentials_rejected() {
        let mut config = valid();
        config.username.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyField("username"))
        ));

        let mut config = valid();
        config.password.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyField("password"))
        ));
    }

    #[test]
    fn non_positive_durations_rejected() {
        let mut config = valid();
        config.data_range_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidNumber {
                field: "data_range_ms",
                ..
            })
        ));

        let mut config = valid();
        config.upload_interval_ms = -5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidNumber {
                field: "upload_interval_ms",
                ..
            })
        ));
    }

    #[test]
    fn default_anchor_parses() {
        let config = valid();
        // 2015-01-01 00:00:00 UTC
        assert_eq!(config.anchor_ms().unwrap(), 1_420_070_400_000);
    }

    #[test]
    fn bad_anchor_rejected() {
        let mut config = valid();
        config.first_upload_date = "not a date".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDate {
                field: "first_upload_date",
                ..
            })
        ));
        assert!(config.anchor_ms().is_err());
    }

    #[test]
    fn toml_overrides_defaults() {
        let config: MeterlinkConfig = Figment::new()
            .merge(Toml::string(
                r#"
                username = "acct"
                password = "secret"
                data_range_ms = 3600000
                report_error_channel_id = "status.upload"
                "#,
            ))
            .extract()
            .unwrap();

        assert_eq!(config.data_range_ms, 3_600_000);
        assert_eq!(config.upload_interval_ms, TWENTY_FOUR_HOURS_MS);
        assert_eq!(
            config.report_error_channel_id.as_deref(),
            Some("status.upload")
        );
        config.validate().unwrap();
    }
}
