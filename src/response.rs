//! Reply latency and reply-ladder statistics
//!
//! Response times are measured between adjacent messages from different
//! senders and filed under the month of the reply. The reply ladder counts
//! double-texts (quick same-sender follow-ups) and conversation enders.

use std::collections::BTreeMap;

use chrono::Duration;
use serde::Serialize;

use crate::models::{NormalizedMessage, SenderCounts};
use crate::segmenter::{ender_counts, Conversation};
use crate::utils::median;

/// Default upper bound (exclusive) on a gap that still counts as a reply
pub const DEFAULT_RESPONSE_WINDOW_HOURS: i64 = 168;

/// Default upper bound (exclusive) on a double-text gap
pub const DEFAULT_DOUBLE_TEXT_MINUTES: i64 = 5;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Median reply latency for one month, in hours
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyResponseTimes {
    /// `YYYY-MM` of the replying messages
    pub month: String,
    /// You replying to them
    pub you_to_them: Option<f64>,
    /// Them replying to you
    pub them_to_you: Option<f64>,
    /// Both directions pooled
    pub all: Option<f64>,
    /// Replies you sent
    pub you_to_them_samples: usize,
    /// Replies they sent
    pub them_to_you_samples: usize,
}

/// Directional reply-latency medians per month
#[derive(Debug, Clone, Copy)]
pub struct ResponseTimeAnalyzer {
    window: Duration,
}

impl Default for ResponseTimeAnalyzer {
    fn default() -> Self {
        Self::new(Duration::hours(DEFAULT_RESPONSE_WINDOW_HOURS))
    }
}

impl ResponseTimeAnalyzer {
    /// Analyzer that ignores gaps at or beyond `window`
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Monthly medians, months in ascending order.
    ///
    /// Every qualifying gap is held until its month is summarized.
    #[must_use]
    pub fn analyze(&self, messages: &[NormalizedMessage]) -> Vec<MonthlyResponseTimes> {
        let mut months: BTreeMap<&str, [Vec<f64>; 2]> = BTreeMap::new();

        for pair in messages.windows(2) {
            let (previous, reply) = (&pair[0], &pair[1]);
            if previous.sender == reply.sender {
                continue;
            }
            let gap = reply.instant - previous.instant;
            if gap <= Duration::zero() || gap >= self.window {
                continue;
            }

            let hours = gap.num_milliseconds() as f64 / MILLIS_PER_HOUR;
            months.entry(reply.month_key.as_str()).or_default()[reply.sender.index()].push(hours);
        }

        months
            .into_iter()
            .map(|(month, samples)| {
                let [yours, theirs] = samples;
                let pooled: Vec<f64> = yours.iter().chain(&theirs).copied().collect();
                MonthlyResponseTimes {
                    month: month.to_string(),
                    you_to_them: median(&yours),
                    them_to_you: median(&theirs),
                    all: median(&pooled),
                    you_to_them_samples: yours.len(),
                    them_to_you_samples: theirs.len(),
                }
            })
            .collect()
    }
}

/// Double-text and ender tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplyLadder {
    /// Quick same-sender follow-ups
    pub double_texts: SenderCounts,
    /// Final senders of conversations
    pub enders: SenderCounts,
}

/// Counts double-texts and conversation enders
#[derive(Debug, Clone, Copy)]
pub struct ReplyLadderAnalyzer {
    double_text_window: Duration,
}

impl Default for ReplyLadderAnalyzer {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_DOUBLE_TEXT_MINUTES))
    }
}

impl ReplyLadderAnalyzer {
    /// Analyzer with a custom double-text window
    #[must_use]
    pub const fn new(double_text_window: Duration) -> Self {
        Self { double_text_window }
    }

    /// Tally double-texts over `messages` and enders over `conversations`
    #[must_use]
    pub fn analyze(
        &self,
        messages: &[NormalizedMessage],
        conversations: &[Conversation<'_>],
    ) -> ReplyLadder {
        ReplyLadder {
            double_texts: self.double_texts(messages),
            enders: ender_counts(conversations),
        }
    }

    /// Adjacent same-sender messages closer than the window
    #[must_use]
    pub fn double_texts(&self, messages: &[NormalizedMessage]) -> SenderCounts {
        let mut counts = SenderCounts::default();
        for pair in messages.windows(2) {
            if pair[0].sender == pair[1].sender
                && pair[1].instant - pair[0].instant < self.double_text_window
            {
                counts.add(pair[1].sender);
            }
        }
        counts
    }
}
