use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use txt_history_analytics::emoji;
use txt_history_analytics::models::utc_to_apple_timestamp;
use txt_history_analytics::response::ResponseTimeAnalyzer;
use txt_history_analytics::segmenter::ConversationSegmenter;
use txt_history_analytics::timeseries::Heatmap;
use txt_history_analytics::{Analyzer, MessageNormalizer, NormalizedMessage, RawMessageRecord, Sender};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 8, 30, 0).unwrap()
}

fn row(at: DateTime<Utc>, is_from_me: bool, text: &str) -> RawMessageRecord {
    RawMessageRecord::with_text(utc_to_apple_timestamp(at), is_from_me, text)
}

/// Rows spaced by the given minute gaps, alternating text
fn rows_from_gaps(gaps: &[(u32, bool)]) -> Vec<RawMessageRecord> {
    let mut at = base();
    gaps.iter()
        .enumerate()
        .map(|(i, &(gap, from_me))| {
            at += Duration::minutes(i64::from(gap));
            row(at, from_me, if i % 2 == 0 { "morning, how did you sleep" } else { "pretty well thanks" })
        })
        .collect()
}

fn normalize(rows: &[RawMessageRecord]) -> Vec<NormalizedMessage> {
    MessageNormalizer::default().normalize_batch(rows).0
}

#[test]
fn test_reply_after_two_hours_is_you_to_them() {
    let messages = normalize(&[
        row(base(), false, "are you free later"),
        row(base() + Duration::hours(2), true, "yes after work"),
    ]);

    let months = ResponseTimeAnalyzer::default().analyze(&messages);

    assert_eq!(months.len(), 1);
    assert_eq!(months[0].month, "2024-05");
    assert_eq!(months[0].you_to_them, Some(2.0));
    assert_eq!(months[0].them_to_you, None);
}

#[test]
fn test_heart_with_variation_selector_is_one_unit() {
    assert_eq!(emoji::extract("I love you ❤️"), vec!["❤️"]);
}

#[test]
fn test_reaction_filter_toggle() {
    let rows = [row(base(), false, "Reacted 'lol' to your message")];

    let (filtered, diagnostics) = MessageNormalizer::default().normalize_batch(&rows);
    assert!(filtered.is_empty());
    assert_eq!(diagnostics.reactions_filtered, 1);

    let (kept, diagnostics) = MessageNormalizer::default()
        .with_reaction_filter(false)
        .normalize_batch(&rows);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].text, "Reacted 'lol' to your message");
    assert_eq!(kept[0].word_count, 5);
    assert_eq!(diagnostics.reactions_filtered, 0);
}

#[test]
fn test_full_analysis_counts_are_consistent() {
    let rows = rows_from_gaps(&[(0, true), (3, true), (40, false), (60 * 30, false), (10, true)]);
    let messages = normalize(&rows);
    let report = Analyzer::default().analyze(&messages, base() + Duration::days(2));

    assert_eq!(report.conversations.len(), 2);
    assert_eq!(report.conversations[0].ender, Sender::Them);
    assert_eq!(report.conversations[1].ender, Sender::Me);
    assert_eq!(report.reply_ladder.double_texts.get(Sender::Me), 1);
    assert_eq!(report.wrapped.total_messages, 5);
    assert_eq!(report.wrapped.you.messages + report.wrapped.them.messages, 5);
    assert_eq!(report.time_series.heatmap.total(), 5);
}

proptest! {
    #[test]
    fn segmenter_output_is_exact_partition(gaps in proptest::collection::vec((0_u32..3000, any::<bool>()), 0..60)) {
        let messages = normalize(&rows_from_gaps(&gaps));
        let conversations = ConversationSegmenter::default().segment(&messages);

        let flattened: Vec<&NormalizedMessage> = conversations.iter().flat_map(|c| c.messages()).collect();
        prop_assert_eq!(flattened.len(), messages.len());
        for (a, b) in flattened.iter().zip(&messages) {
            prop_assert_eq!(*a, b);
        }

        for conversation in &conversations {
            prop_assert!(!conversation.is_empty());
            for pair in conversation.messages().windows(2) {
                prop_assert!(pair[1].instant - pair[0].instant < Duration::hours(24));
            }
        }
        for pair in conversations.windows(2) {
            prop_assert!(pair[1].first().instant - pair[0].last().instant >= Duration::hours(24));
        }
    }

    #[test]
    fn heatmap_sums_to_accepted_messages(gaps in proptest::collection::vec((0_u32..600, any::<bool>()), 0..120)) {
        let (messages, diagnostics) = MessageNormalizer::default().normalize_batch(&rows_from_gaps(&gaps));
        let heatmap = Heatmap::build(&messages);

        prop_assert_eq!(heatmap.rows.len(), 7);
        prop_assert_eq!(heatmap.total(), diagnostics.messages_accepted);
    }

    #[test]
    fn derived_fields_are_reproducible(
        offset_secs in 0_i64..(20 * 365 * 86_400),
        text in "[a-zA-Z ]{1,40}",
        from_me in any::<bool>(),
    ) {
        let at = Utc.with_ymd_and_hms(2005, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(offset_secs);
        let raw = row(at, from_me, &text);
        let normalizer = MessageNormalizer::default().with_reaction_filter(false);

        let first = normalizer.normalize_batch(std::slice::from_ref(&raw)).0;
        let second = normalizer.normalize_batch(std::slice::from_ref(&raw)).0;
        prop_assert_eq!(&first, &second);
        if let Some(message) = first.first() {
            prop_assert_eq!(message.instant, at);
            prop_assert_eq!(message.is_from_me(), from_me);
        }
    }
}
