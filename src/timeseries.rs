//! Activity time series: weekday/hour heatmap, weekly word volume and weekly
//! sender word share.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::models::{day_name, NormalizedMessage, Sender, DAY_ORDER};
use crate::utils::share;

/// Default trailing window for the weekly series
pub const DEFAULT_RECENT_WINDOW_DAYS: i64 = 180;

/// Message counts for one weekday
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapRow {
    /// Weekday name
    pub day: &'static str,
    /// Counts per hour 0-23
    pub hours: [usize; 24],
}

/// Weekday x hour message counts, Monday first, zero-filled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heatmap {
    /// Seven rows in [`DAY_ORDER`]
    pub rows: Vec<HeatmapRow>,
}

impl Default for Heatmap {
    fn default() -> Self {
        Self {
            rows: DAY_ORDER
                .iter()
                .map(|&weekday| HeatmapRow {
                    day: day_name(weekday),
                    hours: [0; 24],
                })
                .collect(),
        }
    }
}

impl Heatmap {
    /// Count every message into its cell
    #[must_use]
    pub fn build(messages: &[NormalizedMessage]) -> Self {
        let mut heatmap = Self::default();
        for message in messages {
            let row = message.weekday.num_days_from_monday() as usize;
            heatmap.rows[row].hours[message.hour as usize] += 1;
        }
        heatmap
    }

    /// Sum of all 168 cells
    #[must_use]
    pub fn total(&self) -> usize {
        self.rows.iter().flat_map(|row| row.hours.iter()).sum()
    }
}

/// Words sent in one week bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyWords {
    /// Bucket key
    pub week_key: String,
    /// Monday-aligned start of the bucket's earliest message
    pub week_start: NaiveDate,
    /// Total words
    pub words: usize,
}

/// Each sender's share of the words in one Monday-aligned week
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyShare {
    /// Monday starting the week
    pub week_start: NaiveDate,
    /// Words you sent
    pub you_words: usize,
    /// Words they sent
    pub them_words: usize,
    /// Your share, 0 when the week has no words
    pub you: f64,
    /// Their share, 0 when the week has no words
    pub them: f64,
}

/// All time-series outputs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    /// Full-history heatmap
    pub heatmap: Heatmap,
    /// Recent words per week
    pub words_per_week: Vec<WeeklyWords>,
    /// Recent per-week sender word shares
    pub conversation_ratio: Vec<WeeklyShare>,
}

/// Builds the heatmap and the trailing-window weekly series
#[derive(Debug, Clone, Copy)]
pub struct TimeSeriesAggregator {
    recent_window: Duration,
}

impl Default for TimeSeriesAggregator {
    fn default() -> Self {
        Self::new(Duration::days(DEFAULT_RECENT_WINDOW_DAYS))
    }
}

impl TimeSeriesAggregator {
    /// Aggregator with a custom trailing window
    #[must_use]
    pub const fn new(recent_window: Duration) -> Self {
        Self { recent_window }
    }

    /// Build every series; the trailing window ends at `now`
    #[must_use]
    pub fn aggregate(&self, messages: &[NormalizedMessage], now: DateTime<Utc>) -> TimeSeries {
        let since = now - self.recent_window;
        TimeSeries {
            heatmap: Heatmap::build(messages),
            words_per_week: words_per_week(messages, since),
            conversation_ratio: conversation_ratio(messages, since),
        }
    }
}

/// Word totals per week key for messages at or after `since`
#[must_use]
pub fn words_per_week(messages: &[NormalizedMessage], since: DateTime<Utc>) -> Vec<WeeklyWords> {
    let mut buckets: BTreeMap<&str, (NaiveDate, usize)> = BTreeMap::new();

    for message in messages.iter().filter(|m| m.instant >= since) {
        let bucket = buckets
            .entry(message.week_key.as_str())
            .or_insert((message.week_start, 0));
        bucket.0 = bucket.0.min(message.week_start);
        bucket.1 += message.word_count;
    }

    buckets
        .into_iter()
        .map(|(key, (week_start, words))| WeeklyWords {
            week_key: key.to_string(),
            week_start,
            words,
        })
        .collect()
}

/// Per-week sender word shares for messages at or after `since`
#[must_use]
pub fn conversation_ratio(messages: &[NormalizedMessage], since: DateTime<Utc>) -> Vec<WeeklyShare> {
    let mut weeks: BTreeMap<NaiveDate, [usize; 2]> = BTreeMap::new();

    for message in messages.iter().filter(|m| m.instant >= since) {
        weeks.entry(message.week_start).or_default()[message.sender.index()] += message.word_count;
    }

    weeks
        .into_iter()
        .map(|(week_start, words)| {
            let you_words = words[Sender::Me.index()];
            let them_words = words[Sender::Them.index()];
            let total = you_words + them_words;
            WeeklyShare {
                week_start,
                you_words,
                them_words,
                you: share(you_words, total),
                them: share(them_words, total),
            }
        })
        .collect()
}
