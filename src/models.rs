//! Data models for message analysis
//!
//! Raw rows as they come out of a message archive, the normalized message
//! every aggregator consumes, and the calendar keys used for bucketing.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Milliseconds between the Unix epoch and 2001-01-01T00:00:00Z.
pub const APPLE_EPOCH_UNIX_MILLIS: i64 = 978_307_200_000;

/// Raw timestamps below this magnitude are whole seconds, not nanoseconds.
///
/// A nanosecond value this small would fall within the first two minutes
/// of 2001, so the two encodings cannot collide in practice.
pub const LEGACY_SECONDS_THRESHOLD: i64 = 100_000_000_000;

/// Days of the week in heatmap row order.
pub const DAY_ORDER: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// A message row exactly as the archive stores it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessageRecord {
    /// Nanoseconds since 2001-01-01T00:00:00 UTC (seconds in legacy archives)
    pub timestamp: i64,
    /// Primary text column, often empty when the payload holds the text
    pub text: Option<String>,
    /// True if the archive owner sent the message
    pub is_from_me: bool,
    /// Opaque serialized body
    pub payload: Option<Vec<u8>>,
}

impl RawMessageRecord {
    /// Row with a plain text body and no payload
    #[must_use]
    pub fn with_text(timestamp: i64, is_from_me: bool, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            text: Some(text.into()),
            is_from_me,
            payload: None,
        }
    }

    /// Row whose text only exists inside the payload
    #[must_use]
    pub fn with_payload(timestamp: i64, is_from_me: bool, payload: Vec<u8>) -> Self {
        Self {
            timestamp,
            text: None,
            is_from_me,
            payload: Some(payload),
        }
    }
}

/// One of the two participants in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sender {
    /// The archive owner
    #[serde(rename = "you")]
    Me,
    /// The other participant
    #[serde(rename = "them")]
    Them,
}

impl Sender {
    /// Both senders, owner first
    pub const ALL: [Self; 2] = [Self::Me, Self::Them];

    /// Map the archive's `is_from_me` flag
    #[must_use]
    pub const fn from_is_from_me(is_from_me: bool) -> Self {
        if is_from_me {
            Self::Me
        } else {
            Self::Them
        }
    }

    /// True for the archive owner
    #[must_use]
    pub const fn is_me(self) -> bool {
        matches!(self, Self::Me)
    }

    /// Index into two-element per-sender arrays
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Me => 0,
            Self::Them => 1,
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Me => write!(f, "You"),
            Self::Them => write!(f, "Them"),
        }
    }
}

/// A tally kept separately for each sender
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SenderCounts {
    /// Your count
    pub you: usize,
    /// Their count
    pub them: usize,
}

impl SenderCounts {
    /// Count one occurrence for `sender`
    pub fn add(&mut self, sender: Sender) {
        match sender {
            Sender::Me => self.you += 1,
            Sender::Them => self.them += 1,
        }
    }

    /// Count for one sender
    #[must_use]
    pub const fn get(&self, sender: Sender) -> usize {
        match sender {
            Sender::Me => self.you,
            Sender::Them => self.them,
        }
    }

    /// Both senders combined
    #[must_use]
    pub const fn total(&self) -> usize {
        self.you + self.them
    }
}

/// Restrict a run to one participant's messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderFilter {
    /// Every message
    #[default]
    All,
    /// Only messages the owner sent
    Me,
    /// Only messages the other participant sent
    Them,
}

impl SenderFilter {
    /// Whether a row with the given flag passes the filter
    #[must_use]
    pub const fn accepts(self, is_from_me: bool) -> bool {
        match self {
            Self::All => true,
            Self::Me => is_from_me,
            Self::Them => !is_from_me,
        }
    }
}

impl FromStr for SenderFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" | "both" => Ok(Self::All),
            "me" | "you" => Ok(Self::Me),
            "them" => Ok(Self::Them),
            other => Err(format!("Unknown sender filter: {other}. Use all, me or them")),
        }
    }
}

/// A message that survived normalization
///
/// Every derived attribute is a pure function of the raw timestamp, text,
/// sender flag and the configured UTC offset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedMessage {
    /// Absolute instant
    pub instant: DateTime<Utc>,
    /// Wall-clock time after applying the configured offset
    pub local: NaiveDateTime,
    /// Non-empty message text
    pub text: String,
    /// Who sent it
    pub sender: Sender,
    /// Number of `\b\w+\b` tokens
    pub word_count: usize,
    /// Length in characters
    pub char_len: usize,
    /// Hour of day, 0-23
    pub hour: u32,
    /// Day of week
    pub weekday: Weekday,
    /// Calendar day
    pub date: NaiveDate,
    /// Year plus `day_of_year / 7`
    pub week_key: String,
    /// Monday on or before `date`
    pub week_start: NaiveDate,
    /// Year and month, `YYYY-MM`
    pub month_key: String,
    /// Polarity in [-1, 1]
    pub sentiment: f32,
}

impl NormalizedMessage {
    /// True if the archive owner sent the message
    #[must_use]
    pub const fn is_from_me(&self) -> bool {
        self.sender.is_me()
    }

    /// English name of the weekday
    #[must_use]
    pub const fn day_name(&self) -> &'static str {
        day_name(self.weekday)
    }
}

/// Convert an archive timestamp to an absolute instant.
///
/// Nanosecond values are floored to milliseconds; values below 10^11 in
/// magnitude are legacy whole seconds. Returns `None` only when
/// the result is outside the representable range.
#[must_use]
pub fn apple_timestamp_to_utc(raw: i64) -> Option<DateTime<Utc>> {
    let millis = if raw.abs() < LEGACY_SECONDS_THRESHOLD {
        raw.checked_mul(1000)?
    } else {
        raw.div_euclid(1_000_000)
    };
    DateTime::from_timestamp_millis(APPLE_EPOCH_UNIX_MILLIS.checked_add(millis)?)
}

/// Inverse of [`apple_timestamp_to_utc`] for nanosecond archives
#[must_use]
pub fn utc_to_apple_timestamp(instant: DateTime<Utc>) -> i64 {
    (instant.timestamp_millis() - APPLE_EPOCH_UNIX_MILLIS) * 1_000_000
}

/// Monday-aligned start of the week containing `date`.
///
/// Sundays belong to the week that started the previous Monday.
#[must_use]
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Week bucket key: year plus floor(day-of-year / 7)
#[must_use]
pub fn week_key(date: NaiveDate) -> String {
    format!("{}-W{:02}", date.year(), date.ordinal() / 7)
}

/// Month bucket key, `YYYY-MM`
#[must_use]
pub fn month_key(date: NaiveDate) -> String {
    format!("{}-{:02}", date.year(), date.month())
}

/// English weekday name
#[must_use]
pub const fn day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_nanosecond_timestamp_conversion() {
        // 2024-01-01T00:00:00Z is 725_760_000 seconds after the archive epoch
        let raw = 725_760_000_i64 * 1_000_000_000;
        let instant = apple_timestamp_to_utc(raw).expect("in range");
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(utc_to_apple_timestamp(instant), raw);
    }

    #[test]
    fn test_legacy_seconds_timestamp_conversion() {
        let instant = apple_timestamp_to_utc(725_760_000).expect("in range");
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_week_start_maps_sunday_to_previous_monday() {
        let sunday = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert_eq!(week_start(sunday), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(week_start(monday), monday);
    }

    #[test]
    fn test_calendar_keys() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 5).unwrap();
        assert_eq!(month_key(date), "2024-02");
        // ordinal 36 / 7 = 5
        assert_eq!(week_key(date), "2024-W05");
    }

    #[test]
    fn test_sender_filter_parsing() {
        assert_eq!("me".parse::<SenderFilter>(), Ok(SenderFilter::Me));
        assert_eq!("THEM".parse::<SenderFilter>(), Ok(SenderFilter::Them));
        assert!("nobody".parse::<SenderFilter>().is_err());
        assert!(SenderFilter::Them.accepts(false));
        assert!(!SenderFilter::Them.accepts(true));
    }
}
