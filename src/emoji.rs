//! Emoji extraction and usage statistics
//!
//! Text is scanned as extended grapheme clusters, so skin-tone modifiers,
//! zero-width-joiner sequences, variation selectors and flag pairs stay
//! attached to their base glyph and count once. Two rules sit on top of the
//! clustering:
//!
//! * a bare gender sign (`♀`, `♂`, with or without a variation selector) is
//!   never counted;
//! * a skin-tone swatch with no pictographic base counts as its own unit.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

use crate::models::{NormalizedMessage, Sender};

/// Default length of the top-emoji lists
pub const DEFAULT_TOP_EMOJI: usize = 20;

/// Emoji tracked month by month
pub const MONTHLY_TOP_EMOJI: usize = 5;

const KEYCAP: char = '\u{20E3}';

const GENDER_SIGNS: &[&str] = &["\u{2640}", "\u{2642}", "\u{2640}\u{FE0F}", "\u{2642}\u{FE0F}"];

fn emoji_base_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\A[\p{Extended_Pictographic}\x{1F1E6}-\x{1F1FF}]").expect("valid emoji base regex")
    })
}

fn skin_tone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\p{Emoji_Modifier}").expect("valid skin tone regex"))
}

/// Emoji units in `text`, in order of appearance
#[must_use]
pub fn extract(text: &str) -> Vec<&str> {
    let mut units = Vec::new();

    for grapheme in text.graphemes(true) {
        if GENDER_SIGNS.contains(&grapheme) {
            continue;
        }
        if emoji_base_re().is_match(grapheme) || grapheme.contains(KEYCAP) {
            units.push(grapheme);
        } else {
            units.extend(skin_tone_re().find_iter(grapheme).map(|m| m.as_str()));
        }
    }

    units
}

/// An emoji and how often it was used
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmojiCount {
    /// The grapheme cluster
    pub emoji: String,
    /// Occurrences
    pub count: usize,
}

/// Occurrence counts that remember first-seen order for tie-breaking
#[derive(Debug, Clone, Default)]
pub struct EmojiTally {
    counts: HashMap<String, (usize, usize)>,
    total: usize,
}

impl EmojiTally {
    /// Count one occurrence
    pub fn add(&mut self, emoji: &str) {
        let order = self.counts.len();
        self.counts.entry(emoji.to_string()).or_insert((0, order)).0 += 1;
        self.total += 1;
    }

    /// Occurrences of one emoji
    #[must_use]
    pub fn count(&self, emoji: &str) -> usize {
        self.counts.get(emoji).map_or(0, |(count, _)| *count)
    }

    /// Total occurrences
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Distinct emoji
    #[must_use]
    pub fn unique(&self) -> usize {
        self.counts.len()
    }

    /// Most used first; ties keep first-seen order
    #[must_use]
    pub fn top(&self, n: usize) -> Vec<EmojiCount> {
        self.ranked()
            .into_iter()
            .take(n)
            .map(|(emoji, count)| EmojiCount {
                emoji: emoji.to_string(),
                count,
            })
            .collect()
    }

    fn ranked(&self) -> Vec<(&str, usize)> {
        let mut entries: Vec<(&str, usize, usize)> = self
            .counts
            .iter()
            .map(|(emoji, &(count, order))| (emoji.as_str(), count, order))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        entries.into_iter().map(|(emoji, count, _)| (emoji, count)).collect()
    }
}

/// One sender's emoji habits
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SenderEmojiStats {
    /// Emoji units sent
    pub total: usize,
    /// Distinct emoji sent
    pub unique: usize,
    /// Units per message sent
    pub average_per_message: f64,
    /// Most used
    pub top: Vec<EmojiCount>,
}

/// An emoji both senders use
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedEmoji {
    /// The grapheme cluster
    pub emoji: String,
    /// Your uses
    pub you: usize,
    /// Their uses
    pub them: usize,
}

/// Counts of the overall top emoji within one month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyEmoji {
    /// `YYYY-MM`
    pub month: String,
    /// Emoji to count; every tracked emoji is present
    pub counts: BTreeMap<String, usize>,
}

/// Mean emoji units per word in one week
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyEmojiDensity {
    /// Monday starting the week
    pub week_start: NaiveDate,
    /// Mean of units / max(words, 1) over the week's messages
    pub density: f64,
}

/// Everything the extractor reports
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmojiReport {
    /// Your statistics
    pub you: SenderEmojiStats,
    /// Their statistics
    pub them: SenderEmojiStats,
    /// Most used across both senders
    pub top: Vec<EmojiCount>,
    /// Used only by you
    pub only_you: Vec<EmojiCount>,
    /// Used only by them
    pub only_them: Vec<EmojiCount>,
    /// Used by both, by combined count
    pub shared: Vec<SharedEmoji>,
    /// Monthly counts of the overall top emoji
    pub monthly: Vec<MonthlyEmoji>,
    /// Weekly emoji density
    pub weekly_density: Vec<WeeklyEmojiDensity>,
}

/// Tallies emoji per sender and over time
#[derive(Debug, Clone, Copy)]
pub struct EmojiExtractor {
    top_n: usize,
}

impl Default for EmojiExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_EMOJI)
    }
}

impl EmojiExtractor {
    /// Extractor reporting `top_n` entries per list
    #[must_use]
    pub const fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    /// Build the full report
    #[must_use]
    pub fn analyze(&self, messages: &[NormalizedMessage]) -> EmojiReport {
        let mut per_sender = [EmojiTally::default(), EmojiTally::default()];
        let mut merged = EmojiTally::default();
        let mut sent = [0_usize; 2];
        let mut density: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();

        for message in messages {
            let units = extract(&message.text);
            let slot = message.sender.index();
            sent[slot] += 1;
            for unit in &units {
                per_sender[slot].add(unit);
                merged.add(unit);
            }

            let week = density.entry(message.week_start).or_default();
            week.0 += units.len() as f64 / message.word_count.max(1) as f64;
            week.1 += 1;
        }

        let tracked: Vec<String> = merged
            .top(MONTHLY_TOP_EMOJI)
            .into_iter()
            .map(|entry| entry.emoji)
            .collect();
        let monthly = monthly_counts(messages, &tracked);

        let [yours, theirs] = &per_sender;
        let (only_you, only_them, shared) = self.overlap(yours, theirs);

        EmojiReport {
            you: self.sender_stats(yours, sent[Sender::Me.index()]),
            them: self.sender_stats(theirs, sent[Sender::Them.index()]),
            top: merged.top(self.top_n),
            only_you,
            only_them,
            shared,
            monthly,
            weekly_density: density
                .into_iter()
                .map(|(week_start, (sum, n))| WeeklyEmojiDensity {
                    week_start,
                    density: sum / n as f64,
                })
                .collect(),
        }
    }

    fn sender_stats(&self, tally: &EmojiTally, messages: usize) -> SenderEmojiStats {
        SenderEmojiStats {
            total: tally.total(),
            unique: tally.unique(),
            average_per_message: crate::utils::share(tally.total(), messages),
            top: tally.top(self.top_n),
        }
    }

    fn overlap(
        &self,
        yours: &EmojiTally,
        theirs: &EmojiTally,
    ) -> (Vec<EmojiCount>, Vec<EmojiCount>, Vec<SharedEmoji>) {
        let only = |mine: &EmojiTally, other: &EmojiTally| -> Vec<EmojiCount> {
            mine.ranked()
                .into_iter()
                .filter(|(emoji, _)| other.count(emoji) == 0)
                .take(self.top_n)
                .map(|(emoji, count)| EmojiCount {
                    emoji: emoji.to_string(),
                    count,
                })
                .collect()
        };

        let mut shared: Vec<SharedEmoji> = yours
            .ranked()
            .into_iter()
            .filter_map(|(emoji, you)| {
                let them = theirs.count(emoji);
                (them > 0).then(|| SharedEmoji {
                    emoji: emoji.to_string(),
                    you,
                    them,
                })
            })
            .collect();
        // Stable: equal combined counts keep your ranking order.
        shared.sort_by(|a, b| (b.you + b.them).cmp(&(a.you + a.them)));
        shared.truncate(self.top_n);

        (only(yours, theirs), only(theirs, yours), shared)
    }
}

fn monthly_counts(messages: &[NormalizedMessage], tracked: &[String]) -> Vec<MonthlyEmoji> {
    let mut months: BTreeMap<&str, BTreeMap<String, usize>> = BTreeMap::new();

    for message in messages {
        let counts = months.entry(message.month_key.as_str()).or_insert_with(|| {
            tracked.iter().map(|emoji| (emoji.clone(), 0)).collect()
        });
        for unit in extract(&message.text) {
            if let Some(count) = counts.get_mut(unit) {
                *count += 1;
            }
        }
    }

    months
        .into_iter()
        .map(|(month, counts)| MonthlyEmoji {
            month: month.to_string(),
            counts,
        })
        .collect()
}
