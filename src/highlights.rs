//! Highlights: messaging streaks, unusually busy days and first appearances
//! of a few relationship milestones.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::{NormalizedMessage, Sender};
use crate::nlp::fold_for_matching;
use crate::utils::quantile;

/// Default number of streaks reported
pub const DEFAULT_STREAK_LIMIT: usize = 10;

/// Default number of big days reported
pub const DEFAULT_BIG_DAY_LIMIT: usize = 10;

/// Consecutive calendar days with at least one message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Streak {
    /// First day
    pub start: NaiveDate,
    /// Last day
    pub end: NaiveDate,
    /// Length in days
    pub days: usize,
}

/// A day whose word total is an upper outlier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BigDay {
    /// Calendar day
    pub date: NaiveDate,
    /// Words that day
    pub words: usize,
    /// Messages that day
    pub messages: usize,
}

/// Phrases whose first use is worth remembering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    /// "love you" and variants
    LoveYou,
    /// Heart emoji
    Heart,
    /// Terms of endearment
    PetName,
}

impl Milestone {
    /// Every milestone in report order
    pub const ALL: [Self; 3] = [Self::LoveYou, Self::Heart, Self::PetName];

    /// Case-insensitive substrings that mark the milestone
    #[must_use]
    pub const fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::LoveYou => &["love you", "i love you", "love u"],
            Self::Heart => &["❤️", "💕", "💖", "💗", "💓"],
            Self::PetName => &["babe", "baby", "honey", "sweetie", "darling", "dear"],
        }
    }
}

/// The first message that hit a milestone
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirstAppearance {
    /// Which milestone
    pub milestone: Milestone,
    /// When it first happened, if ever
    pub instant: Option<DateTime<Utc>>,
    /// Who said it
    pub sender: Option<Sender>,
    /// The message
    pub text: Option<String>,
}

/// All highlight outputs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlights {
    /// Longest streaks, longest first
    pub streaks: Vec<Streak>,
    /// Word total above which a day counts as big
    pub big_day_threshold: Option<f64>,
    /// Biggest outlier days, most words first
    pub big_days: Vec<BigDay>,
    /// First appearance of each milestone
    pub first_appearances: Vec<FirstAppearance>,
}

/// Limits for the highlight lists
#[derive(Debug, Clone, Copy)]
pub struct HighlightDetector {
    streak_limit: usize,
    big_day_limit: usize,
}

impl Default for HighlightDetector {
    fn default() -> Self {
        Self::new(DEFAULT_STREAK_LIMIT, DEFAULT_BIG_DAY_LIMIT)
    }
}

impl HighlightDetector {
    /// Detector with custom list lengths
    #[must_use]
    pub const fn new(streak_limit: usize, big_day_limit: usize) -> Self {
        Self {
            streak_limit,
            big_day_limit,
        }
    }

    /// Compute every highlight
    #[must_use]
    pub fn detect(&self, messages: &[NormalizedMessage]) -> Highlights {
        let mut per_day: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();
        for message in messages {
            let day = per_day.entry(message.date).or_default();
            day.0 += message.word_count;
            day.1 += 1;
        }

        let (big_day_threshold, big_days) = self.big_days(&per_day);
        Highlights {
            streaks: self.streaks(per_day.keys().copied()),
            big_day_threshold,
            big_days,
            first_appearances: first_appearances(messages),
        }
    }

    fn streaks(&self, days: impl Iterator<Item = NaiveDate>) -> Vec<Streak> {
        let mut streaks: Vec<Streak> = Vec::new();

        for day in days {
            match streaks.last_mut() {
                Some(current) if current.end.succ_opt() == Some(day) => {
                    current.end = day;
                    current.days += 1;
                },
                _ => streaks.push(Streak {
                    start: day,
                    end: day,
                    days: 1,
                }),
            }
        }

        streaks.sort_by(|a, b| b.days.cmp(&a.days).then(a.start.cmp(&b.start)));
        streaks.truncate(self.streak_limit);
        streaks
    }

    fn big_days(&self, per_day: &BTreeMap<NaiveDate, (usize, usize)>) -> (Option<f64>, Vec<BigDay>) {
        let words: Vec<f64> = per_day.values().map(|&(w, _)| w as f64).collect();
        let (Some(q1), Some(q3)) = (quantile(&words, 0.25), quantile(&words, 0.75)) else {
            return (None, Vec::new());
        };
        let threshold = q3 + 1.5 * (q3 - q1);

        let mut big: Vec<BigDay> = per_day
            .iter()
            .filter(|(_, &(w, _))| w as f64 > threshold)
            .map(|(&date, &(words, messages))| BigDay {
                date,
                words,
                messages,
            })
            .collect();
        big.sort_by(|a, b| b.words.cmp(&a.words).then(a.date.cmp(&b.date)));
        big.truncate(self.big_day_limit);

        (Some(threshold), big)
    }
}

/// First message containing each milestone's keywords
#[must_use]
pub fn first_appearances(messages: &[NormalizedMessage]) -> Vec<FirstAppearance> {
    let mut found: [Option<&NormalizedMessage>; 3] = [None; 3];

    for message in messages {
        if found.iter().all(Option::is_some) {
            break;
        }
        let folded = fold_for_matching(&message.text);
        for (slot, milestone) in Milestone::ALL.iter().enumerate() {
            if found[slot].is_none() && milestone.keywords().iter().any(|k| folded.contains(k)) {
                found[slot] = Some(message);
            }
        }
    }

    Milestone::ALL
        .iter()
        .zip(found)
        .map(|(&milestone, hit)| FirstAppearance {
            milestone,
            instant: hit.map(|m| m.instant),
            sender: hit.map(|m| m.sender),
            text: hit.map(|m| m.text.clone()),
        })
        .collect()
}
