use anyhow::{anyhow, Context, Result};
use chrono::{Duration, FixedOffset, Offset, Utc};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::emoji::DEFAULT_TOP_EMOJI;
use crate::highlights::{DEFAULT_BIG_DAY_LIMIT, DEFAULT_STREAK_LIMIT};
use crate::response::{DEFAULT_DOUBLE_TEXT_MINUTES, DEFAULT_RESPONSE_WINDOW_HOURS};
use crate::segmenter::DEFAULT_CONVERSATION_GAP_HOURS;
use crate::timeseries::DEFAULT_RECENT_WINDOW_DAYS;
use crate::topics::DEFAULT_INSIDE_JOKE_MIN_REPEATS;
use crate::validation::MAX_BATCH_SIZE;
use crate::wrapped::DEFAULT_LEADERBOARD_SIZE;

/// Largest UTC offset accepted, in minutes
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Longest analysis window accepted, in days
pub const MAX_WINDOW_DAYS: i64 = 100 * 366;

/// Messages database location under the user's home directory
const MESSAGES_DB_RELATIVE_PATH: &str = "Library/Messages/chat.db";

/// Application configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log level, file and format
    pub logging: LoggingConfig,
    /// Where messages are read from
    pub source: SourceConfig,
    /// Normalization settings
    pub ingest: IngestConfig,
    /// Aggregator windows and limits
    pub analysis: AnalysisConfig,
    /// Report format and destination
    pub output: OutputConfig,
}

/// Logging section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `trace` through `error`
    pub level: String,
    /// Directory-qualified file for the rolling JSON log
    pub file_path: Option<String>,
    /// "json" or "text"
    pub format: String,
}

/// Source section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to chat.db
    pub database_path: String,
    /// Phone number or email of the other participant
    pub contact: Option<String>,
}

/// Ingest section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Rows per normalization chunk
    pub batch_size: usize,
    /// Drop reaction notifications
    pub reaction_filter: bool,
    /// Fixed offset used for calendar fields
    pub utc_offset_minutes: i32,
}

/// Analysis section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Silence that starts a new conversation
    pub conversation_gap_hours: i64,
    /// Window in which a second message counts as a double-text
    pub double_text_minutes: i64,
    /// Longest gap still counted as a reply
    pub response_window_hours: i64,
    /// Trailing window for weekly series
    pub recent_window_days: i64,
    /// Emoji kept in each ranking
    pub top_emoji: usize,
    /// Longest messages kept
    pub leaderboard_size: usize,
    /// Big days reported
    pub big_day_limit: usize,
    /// Streaks reported
    pub streak_limit: usize,
    /// Repeats before a phrase is an inside joke
    pub inside_joke_min_repeats: usize,
}

/// Output section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// "json" or "yaml"
    pub format: String,
    /// Report file; stdout when absent
    pub path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            source: SourceConfig {
                database_path: default_database_path().to_string_lossy().into_owned(),
                contact: None,
            },
            ingest: IngestConfig {
                batch_size: 1000,
                reaction_filter: true,
                utc_offset_minutes: 0,
            },
            analysis: AnalysisConfig::default(),
            output: OutputConfig {
                format: "json".to_string(),
                path: None,
            },
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            conversation_gap_hours: DEFAULT_CONVERSATION_GAP_HOURS,
            double_text_minutes: DEFAULT_DOUBLE_TEXT_MINUTES,
            response_window_hours: DEFAULT_RESPONSE_WINDOW_HOURS,
            recent_window_days: DEFAULT_RECENT_WINDOW_DAYS,
            top_emoji: DEFAULT_TOP_EMOJI,
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
            big_day_limit: DEFAULT_BIG_DAY_LIMIT,
            streak_limit: DEFAULT_STREAK_LIMIT,
            inside_joke_min_repeats: DEFAULT_INSIDE_JOKE_MIN_REPEATS,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file locations and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with precedence: defaults, then `config/default`,
    /// `config/local` and `config` files, then `extra` if given, then
    /// `TXT_ANALYTICS_*` environment variables (`__` between section and key).
    pub fn load_from(extra: Option<&Path>) -> Result<Self> {
        let defaults =
            Config::try_from(&Self::default()).context("Failed to serialize default configuration")?;

        let mut builder = Config::builder()
            .add_source(defaults)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("config").required(false));

        if let Some(path) = extra {
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("TXT_ANALYTICS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?;

        let app_config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        if self.ingest.batch_size == 0 || self.ingest.batch_size > MAX_BATCH_SIZE {
            return Err(anyhow!("batch_size must be between 1 and {MAX_BATCH_SIZE}"));
        }
        if self.ingest.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(anyhow!(
                "utc_offset_minutes must be within ±{MAX_UTC_OFFSET_MINUTES}"
            ));
        }

        let analysis = &self.analysis;
        for (name, value, max) in [
            ("conversation_gap_hours", analysis.conversation_gap_hours, MAX_WINDOW_DAYS * 24),
            ("double_text_minutes", analysis.double_text_minutes, MAX_WINDOW_DAYS * 24 * 60),
            ("response_window_hours", analysis.response_window_hours, MAX_WINDOW_DAYS * 24),
            ("recent_window_days", analysis.recent_window_days, MAX_WINDOW_DAYS),
        ] {
            if value <= 0 || value > max {
                return Err(anyhow!("{name} must be between 1 and {max}"));
            }
        }
        for (name, value) in [
            ("top_emoji", analysis.top_emoji),
            ("leaderboard_size", analysis.leaderboard_size),
            ("inside_joke_min_repeats", analysis.inside_joke_min_repeats),
        ] {
            if value == 0 {
                return Err(anyhow!("{name} must be greater than 0"));
            }
        }

        let valid_outputs = ["json", "yaml"];
        if !valid_outputs.contains(&self.output.format.as_str()) {
            return Err(anyhow!(
                "Invalid output format: {}. Must be one of: {:?}",
                self.output.format,
                valid_outputs
            ));
        }

        Ok(())
    }

    /// Get the chat.db path from environment or config
    #[must_use]
    pub fn get_database_path(&self) -> PathBuf {
        std::env::var("IMESSAGE_DB_PATH")
            .map_or_else(|_| PathBuf::from(&self.source.database_path), PathBuf::from)
    }

    /// Get log level from environment or config
    #[must_use]
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}

impl IngestConfig {
    /// The configured offset; out-of-range values fall back to UTC
    #[must_use]
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }
}

/// `~/Library/Messages/chat.db`, or the relative path when `HOME` is unset
#[must_use]
pub fn default_database_path() -> PathBuf {
    std::env::var_os("HOME").map_or_else(
        || PathBuf::from(MESSAGES_DB_RELATIVE_PATH),
        |home| PathBuf::from(home).join(MESSAGES_DB_RELATIVE_PATH),
    )
}

/// Clamp a configured count so the duration built from it cannot overflow
const fn bounded(value: i64, max: i64) -> i64 {
    if value > max {
        max
    } else if value < -max {
        -max
    } else {
        value
    }
}

impl AnalysisConfig {
    /// Conversation gap as a duration
    #[must_use]
    pub fn conversation_gap(&self) -> Duration {
        Duration::hours(bounded(self.conversation_gap_hours, MAX_WINDOW_DAYS * 24))
    }

    /// Double-text window as a duration
    #[must_use]
    pub fn double_text_window(&self) -> Duration {
        Duration::minutes(bounded(self.double_text_minutes, MAX_WINDOW_DAYS * 24 * 60))
    }

    /// Reply window as a duration
    #[must_use]
    pub fn response_window(&self) -> Duration {
        Duration::hours(bounded(self.response_window_hours, MAX_WINDOW_DAYS * 24))
    }

    /// Trailing window as a duration
    #[must_use]
    pub fn recent_window(&self) -> Duration {
        Duration::days(bounded(self.recent_window_days, MAX_WINDOW_DAYS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.analysis.conversation_gap_hours, 24);
        assert_eq!(config.analysis.top_emoji, 20);
    }

    #[test]
    fn test_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = AppConfig::default();
        config.analysis.response_window_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_database_path_under_messages() {
        let config = AppConfig::default();
        assert!(config.source.database_path.ends_with("Library/Messages/chat.db"));
    }

    #[test]
    fn test_oversized_window_is_rejected() {
        let mut config = AppConfig::default();
        config.analysis.conversation_gap_hours = i64::MAX;
        assert!(config.validate().is_err());

        config.analysis.conversation_gap_hours = MAX_WINDOW_DAYS * 24;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duration_accessors_do_not_overflow() {
        let analysis = AnalysisConfig {
            conversation_gap_hours: i64::MAX,
            double_text_minutes: i64::MIN,
            response_window_hours: i64::MAX,
            recent_window_days: i64::MAX,
            ..AnalysisConfig::default()
        };

        assert_eq!(analysis.conversation_gap(), Duration::days(MAX_WINDOW_DAYS));
        assert_eq!(analysis.double_text_window(), -Duration::days(MAX_WINDOW_DAYS));
        assert_eq!(analysis.recent_window(), Duration::days(MAX_WINDOW_DAYS));
    }

    #[test]
    fn test_offset_conversion() {
        let mut config = AppConfig::default();
        config.ingest.utc_offset_minutes = -300;
        assert_eq!(config.ingest.utc_offset().local_minus_utc(), -18_000);
    }
}
