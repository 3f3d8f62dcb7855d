//! Topics: compliments versus logistics per week, inside jokes and monthly
//! topic mentions.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::NormalizedMessage;
use crate::nlp::{classify_message, fold_for_matching, stop_words, words, MessageKind};

/// Default repeat count for a word to qualify as an inside joke
pub const DEFAULT_INSIDE_JOKE_MIN_REPEATS: usize = 5;

/// Inside-joke words must be longer than this
const INSIDE_JOKE_MIN_LEN: usize = 2;

/// Keyword lists for the tracked topics
pub const TOPICS: &[(&str, &[&str])] = &[
    (
        "travel",
        &["travel", "trip", "flight", "airport", "hotel", "vacation", "beach", "plane", "ticket", "going", "visit"],
    ),
    (
        "work",
        &["work", "office", "meeting", "project", "deadline", "boss", "colleague", "job", "career", "business"],
    ),
    (
        "food",
        &[
            "food", "eat", "restaurant", "dinner", "lunch", "breakfast", "cooking", "recipe", "hungry", "meal", "pizza",
            "coffee",
        ],
    ),
];

/// Message kinds in one Monday-aligned week
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyKinds {
    /// Monday starting the week
    pub week_start: NaiveDate,
    /// Compliment messages
    pub compliment: usize,
    /// Logistics messages
    pub logistics: usize,
    /// Everything else
    pub other: usize,
    /// compliment / (compliment + logistics); `None` when both are zero
    pub compliment_ratio: Option<f64>,
}

/// A word repeated often enough to look like a running joke
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsideJoke {
    /// Lower-cased word
    pub word: String,
    /// Occurrences across all messages
    pub count: usize,
}

/// Topic mentions for one month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyTopics {
    /// `YYYY-MM`
    pub month: String,
    /// Messages mentioning each topic, in [`TOPICS`] order
    pub topics: BTreeMap<String, usize>,
    /// Inside-joke words found across the month's messages
    pub inside_jokes: usize,
}

/// Topic outputs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicReport {
    /// Weekly message-kind counts
    pub weekly_kinds: Vec<WeeklyKinds>,
    /// Inside jokes, most frequent first
    pub inside_jokes: Vec<InsideJoke>,
    /// Monthly topic mentions
    pub monthly: Vec<MonthlyTopics>,
}

/// Builds the topic report
#[derive(Debug, Clone, Copy)]
pub struct TopicAnalyzer {
    inside_joke_min_repeats: usize,
}

impl Default for TopicAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_INSIDE_JOKE_MIN_REPEATS)
    }
}

impl TopicAnalyzer {
    /// Analyzer with a custom inside-joke threshold
    #[must_use]
    pub const fn new(inside_joke_min_repeats: usize) -> Self {
        Self {
            inside_joke_min_repeats,
        }
    }

    /// Compute every topic series
    #[must_use]
    pub fn analyze(&self, messages: &[NormalizedMessage]) -> TopicReport {
        let inside_jokes = self.inside_jokes(messages);
        TopicReport {
            weekly_kinds: weekly_kinds(messages),
            monthly: monthly_topics(messages, &inside_jokes),
            inside_jokes,
        }
    }

    /// Frequent non-stop-words, count descending then alphabetical
    #[must_use]
    pub fn inside_jokes(&self, messages: &[NormalizedMessage]) -> Vec<InsideJoke> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for message in messages {
            for word in words(&message.text) {
                *counts.entry(word).or_default() += 1;
            }
        }

        let stop = stop_words();
        let mut jokes: Vec<InsideJoke> = counts
            .into_iter()
            .filter(|(word, count)| {
                *count >= self.inside_joke_min_repeats
                    && word.chars().count() > INSIDE_JOKE_MIN_LEN
                    && !stop.contains(word)
            })
            .map(|(word, count)| InsideJoke { word, count })
            .collect();
        jokes.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
        jokes
    }
}

/// Compliment/logistics/other counts per week
#[must_use]
pub fn weekly_kinds(messages: &[NormalizedMessage]) -> Vec<WeeklyKinds> {
    let mut weeks: BTreeMap<NaiveDate, [usize; 3]> = BTreeMap::new();
    for message in messages {
        let slot = match classify_message(&message.text) {
            MessageKind::Compliment => 0,
            MessageKind::Logistics => 1,
            MessageKind::Other => 2,
        };
        weeks.entry(message.week_start).or_default()[slot] += 1;
    }

    weeks
        .into_iter()
        .map(|(week_start, [compliment, logistics, other])| {
            let sweet_or_planning = compliment + logistics;
            WeeklyKinds {
                week_start,
                compliment,
                logistics,
                other,
                compliment_ratio: (sweet_or_planning > 0)
                    .then(|| compliment as f64 / sweet_or_planning as f64),
            }
        })
        .collect()
}

/// Per-month topic mentions; one count per message per topic
#[must_use]
pub fn monthly_topics(messages: &[NormalizedMessage], inside_jokes: &[InsideJoke]) -> Vec<MonthlyTopics> {
    let mut months: BTreeMap<&str, MonthlyTopics> = BTreeMap::new();

    for message in messages {
        let entry = months.entry(message.month_key.as_str()).or_insert_with(|| MonthlyTopics {
            month: message.month_key.clone(),
            topics: TOPICS.iter().map(|(name, _)| ((*name).to_string(), 0)).collect(),
            inside_jokes: 0,
        });

        let folded = fold_for_matching(&message.text);
        for (name, keywords) in TOPICS {
            if keywords.iter().any(|k| folded.contains(k)) {
                if let Some(count) = entry.topics.get_mut(*name) {
                    *count += 1;
                }
            }
        }
        entry.inside_jokes += inside_jokes
            .iter()
            .filter(|joke| folded.contains(joke.word.as_str()))
            .count();
    }

    months.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sender;
    use crate::normalizer::MessageNormalizer;
    use chrono::{Duration, TimeZone, Utc};

    fn message(day: i64, text: &str) -> NormalizedMessage {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::days(day);
        MessageNormalizer::default().derive(at, text.to_string(), Sender::Me)
    }

    #[test]
    fn test_weekly_kinds_and_ratio() {
        let messages = vec![
            message(0, "you look gorgeous"),
            message(1, "what time is dinner"),
            message(2, "lol"),
            message(8, "ok"),
        ];
        let weeks = weekly_kinds(&messages);

        assert_eq!(weeks.len(), 2);
        assert_eq!((weeks[0].compliment, weeks[0].logistics, weeks[0].other), (1, 1, 1));
        assert_eq!(weeks[0].compliment_ratio, Some(0.5));
        assert_eq!(weeks[1].compliment_ratio, None);
    }

    #[test]
    fn test_inside_jokes_filter_stop_words_and_short_words() {
        let messages: Vec<_> = (0..5).map(|d| message(d, "the narwhal is ok")).collect();
        let jokes = TopicAnalyzer::default().inside_jokes(&messages);

        assert_eq!(jokes, vec![InsideJoke { word: "narwhal".into(), count: 5 }]);
    }

    #[test]
    fn test_inside_jokes_sorted_by_count_then_word() {
        let mut messages: Vec<_> = (0..3).map(|d| message(d, "zebra apple")).collect();
        messages.push(message(3, "zebra"));
        let jokes = TopicAnalyzer::new(3).inside_jokes(&messages);

        let words: Vec<&str> = jokes.iter().map(|j| j.word.as_str()).collect();
        assert_eq!(words, vec!["zebra", "apple"]);
    }

    #[test]
    fn test_monthly_topics_count_once_per_message() {
        let messages = vec![
            message(0, "flight to the airport then hotel"),
            message(1, "pizza for dinner"),
            message(40, "big meeting at work"),
        ];
        let monthly = monthly_topics(&messages, &[InsideJoke { word: "pizza".into(), count: 5 }]);

        assert_eq!(monthly.len(), 2);
        assert_eq!(monthly[0].topics.get("travel"), Some(&1));
        assert_eq!(monthly[0].topics.get("food"), Some(&1));
        assert_eq!(monthly[0].topics.get("work"), Some(&0));
        assert_eq!(monthly[0].inside_jokes, 1);
        assert_eq!(monthly[1].topics.get("work"), Some(&1));
    }
}
