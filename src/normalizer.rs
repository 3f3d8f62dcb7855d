//! Message normalization
//!
//! Turns [`RawMessageRecord`]s into [`NormalizedMessage`]s: resolves the text
//! (primary column first, decoded payload second), applies the optional
//! reaction filter and derives calendar and lexical attributes. Every drop is
//! counted in [`IngestDiagnostics`]; nothing here fails a batch.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc};
use serde::Serialize;
use tracing::{trace, warn};

use crate::decoder::{self, DecodeError, DecodeStrategy};
use crate::models::{
    apple_timestamp_to_utc, month_key, week_key, week_start, NormalizedMessage, RawMessageRecord,
    Sender,
};
use crate::nlp::{count_words, is_reaction_message, LexiconScorer, SentimentScorer};

/// Counters for everything the ingest pass accepted, decoded or dropped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestDiagnostics {
    /// Rows handed to the normalizer
    pub rows_read: usize,
    /// Rows that became messages
    pub messages_accepted: usize,
    /// Rows with neither text nor a usable payload
    pub skipped_no_text: usize,
    /// Rows dropped by the reaction filter
    pub reactions_filtered: usize,
    /// Payloads that yielded text
    pub payloads_decoded: usize,
    /// Payloads no strategy could read
    pub payloads_undecoded: usize,
    /// Rows whose timestamp is outside the representable range
    pub invalid_timestamps: usize,
    /// Winning strategy tallies
    pub decoded_by_strategy: BTreeMap<DecodeStrategy, usize>,
}

impl IngestDiagnostics {
    /// Fold another batch's counters into this one
    pub fn merge(&mut self, other: Self) {
        self.rows_read += other.rows_read;
        self.messages_accepted += other.messages_accepted;
        self.skipped_no_text += other.skipped_no_text;
        self.reactions_filtered += other.reactions_filtered;
        self.payloads_decoded += other.payloads_decoded;
        self.payloads_undecoded += other.payloads_undecoded;
        self.invalid_timestamps += other.invalid_timestamps;
        for (strategy, count) in other.decoded_by_strategy {
            *self.decoded_by_strategy.entry(strategy).or_default() += count;
        }
    }

    /// Rows dropped for any reason
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.skipped_no_text + self.reactions_filtered + self.payloads_undecoded + self.invalid_timestamps
    }
}

/// Converts raw rows into normalized messages
#[derive(Clone)]
pub struct MessageNormalizer {
    scorer: Arc<dyn SentimentScorer>,
    reaction_filter: bool,
    offset: FixedOffset,
}

impl Default for MessageNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(LexiconScorer::new()))
    }
}

impl std::fmt::Debug for MessageNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageNormalizer")
            .field("reaction_filter", &self.reaction_filter)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl MessageNormalizer {
    /// Normalizer with the reaction filter on and UTC calendar fields
    #[must_use]
    pub fn new(scorer: Arc<dyn SentimentScorer>) -> Self {
        Self {
            scorer,
            reaction_filter: true,
            offset: Utc.fix(),
        }
    }

    /// Enable or disable the reaction filter
    #[must_use]
    pub const fn with_reaction_filter(mut self, enabled: bool) -> Self {
        self.reaction_filter = enabled;
        self
    }

    /// Fixed offset used for hour, weekday and calendar keys
    #[must_use]
    pub const fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Normalize a batch, preserving input order
    #[must_use]
    pub fn normalize_batch(&self, rows: &[RawMessageRecord]) -> (Vec<NormalizedMessage>, IngestDiagnostics) {
        let mut diagnostics = IngestDiagnostics::default();
        let messages = rows
            .iter()
            .filter_map(|row| self.normalize_one(row, &mut diagnostics))
            .collect();
        (messages, diagnostics)
    }

    /// Normalize one row, counting it in `diagnostics`
    pub fn normalize_one(
        &self,
        row: &RawMessageRecord,
        diagnostics: &mut IngestDiagnostics,
    ) -> Option<NormalizedMessage> {
        diagnostics.rows_read += 1;

        let text = Self::resolve_text(row, diagnostics)?;

        if self.reaction_filter && is_reaction_message(&text) {
            diagnostics.reactions_filtered += 1;
            return None;
        }

        let Some(instant) = apple_timestamp_to_utc(row.timestamp) else {
            warn!(timestamp = row.timestamp, "Timestamp out of range, dropping row");
            diagnostics.invalid_timestamps += 1;
            return None;
        };

        diagnostics.messages_accepted += 1;
        Some(self.derive(instant, text, Sender::from_is_from_me(row.is_from_me)))
    }

    fn resolve_text(row: &RawMessageRecord, diagnostics: &mut IngestDiagnostics) -> Option<String> {
        if let Some(text) = row.text.as_deref().filter(|t| !t.trim().is_empty()) {
            return Some(text.to_string());
        }

        match decoder::decode_optional(row.payload.as_deref()) {
            Ok(decoded) => {
                diagnostics.payloads_decoded += 1;
                *diagnostics
                    .decoded_by_strategy
                    .entry(decoded.strategy)
                    .or_default() += 1;
                Some(decoded.text)
            },
            Err(DecodeError::EmptyPayload) => {
                diagnostics.skipped_no_text += 1;
                None
            },
            Err(e @ DecodeError::Undecodable { .. }) => {
                warn!(timestamp = row.timestamp, error = %e, "Payload undecodable, dropping row");
                diagnostics.payloads_undecoded += 1;
                None
            },
        }
    }

    /// Build a message from an instant, text and sender.
    ///
    /// Pure: the same inputs always give the same derived attributes.
    #[must_use]
    pub fn derive(&self, instant: DateTime<Utc>, text: String, sender: Sender) -> NormalizedMessage {
        let local = instant.with_timezone(&self.offset).naive_local();
        let date = local.date();
        let sentiment = self.scorer.score(&text);
        trace!(%instant, sentiment, "Message normalized");

        NormalizedMessage {
            instant,
            local,
            word_count: count_words(&text),
            char_len: text.chars().count(),
            hour: local.hour(),
            weekday: date.weekday(),
            date,
            week_key: week_key(date),
            week_start: week_start(date),
            month_key: month_key(date),
            sentiment,
            text,
            sender,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Weekday};

    use crate::models::utc_to_apple_timestamp;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> i64 {
        utc_to_apple_timestamp(Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap())
    }

    #[test]
    fn test_primary_text_preferred_over_payload() {
        let row = RawMessageRecord {
            timestamp: ts(2024, 3, 4, 9),
            text: Some("primary".into()),
            is_from_me: true,
            payload: Some(b"\x00payload text here\x00".to_vec()),
        };
        let (messages, diagnostics) = MessageNormalizer::default().normalize_batch(&[row]);
        assert_eq!(messages[0].text, "primary");
        assert_eq!(diagnostics.payloads_decoded, 0);
    }

    #[test]
    fn test_payload_text_used_when_primary_empty() {
        let mut row = RawMessageRecord::with_payload(ts(2024, 3, 4, 9), false, b"\x00see you soon\x00".to_vec());
        row.text = Some(String::new());

        let (messages, diagnostics) = MessageNormalizer::default().normalize_batch(&[row]);
        assert_eq!(messages[0].text, "see you soon");
        assert_eq!(messages[0].sender, Sender::Them);
        assert_eq!(diagnostics.payloads_decoded, 1);
        assert_eq!(diagnostics.decoded_by_strategy.get(&DecodeStrategy::AsciiScan), Some(&1));
    }

    #[test]
    fn test_drops_are_counted() {
        let rows = vec![
            RawMessageRecord { timestamp: ts(2024, 3, 4, 9), text: None, is_from_me: true, payload: None },
            RawMessageRecord::with_payload(ts(2024, 3, 4, 9), true, vec![0x00, 0x01, 0x02]),
            RawMessageRecord::with_text(ts(2024, 3, 4, 9), false, "Loved 'hi'"),
            RawMessageRecord::with_text(ts(2024, 3, 4, 9), false, "kept"),
        ];

        let (messages, diagnostics) = MessageNormalizer::default().normalize_batch(&rows);
        assert_eq!(messages.len(), 1);
        assert_eq!(diagnostics.rows_read, 4);
        assert_eq!(diagnostics.skipped_no_text, 1);
        assert_eq!(diagnostics.payloads_undecoded, 1);
        assert_eq!(diagnostics.reactions_filtered, 1);
        assert_eq!(diagnostics.messages_accepted, 1);
        assert_eq!(diagnostics.dropped(), 3);
    }

    #[test]
    fn test_reaction_filter_can_be_disabled() {
        let row = RawMessageRecord::with_text(ts(2024, 3, 4, 9), false, "Reacted 'lol' to your message");
        let normalizer = MessageNormalizer::default().with_reaction_filter(false);
        let (messages, diagnostics) = normalizer.normalize_batch(&[row]);

        assert_eq!(messages[0].text, "Reacted 'lol' to your message");
        assert_eq!(messages[0].word_count, 5);
        assert_eq!(diagnostics.reactions_filtered, 0);
    }

    #[test]
    fn test_calendar_fields_follow_offset() {
        let row = RawMessageRecord::with_text(ts(2024, 3, 4, 2), true, "early");
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let normalizer = MessageNormalizer::default().with_utc_offset(offset);
        let (messages, _) = normalizer.normalize_batch(&[row]);

        let message = &messages[0];
        assert_eq!(message.hour, 21);
        assert_eq!(message.weekday, Weekday::Sun);
        assert_eq!(message.date, NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
        assert_eq!(message.week_start, NaiveDate::from_ymd_opt(2024, 2, 26).unwrap());
        assert_eq!(message.month_key, "2024-03");
    }

    #[test]
    fn test_merge_sums_counters() {
        let mut total = IngestDiagnostics::default();
        let mut batch = IngestDiagnostics { rows_read: 2, payloads_decoded: 1, ..Default::default() };
        batch.decoded_by_strategy.insert(DecodeStrategy::Utf8Window, 1);
        total.merge(batch.clone());
        total.merge(batch);

        assert_eq!(total.rows_read, 4);
        assert_eq!(total.decoded_by_strategy.get(&DecodeStrategy::Utf8Window), Some(&2));
    }
}
