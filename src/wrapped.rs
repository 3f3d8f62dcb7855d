//! Year-in-review style summary statistics

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::emoji::EmojiCount;
use crate::models::{NormalizedMessage, Sender, SenderCounts};
use crate::response::ReplyLadder;

/// Default leaderboard length
pub const DEFAULT_LEADERBOARD_SIZE: usize = 10;

/// Message and word totals for one sender
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SenderTotals {
    /// Messages sent
    pub messages: usize,
    /// Words sent
    pub words: usize,
}

/// The busiest calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MostActiveDay {
    /// Calendar day
    pub date: NaiveDate,
    /// Messages that day
    pub messages: usize,
}

/// A message ranked by length
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LongestMessage {
    /// When it was sent
    pub instant: DateTime<Utc>,
    /// Who sent it
    pub sender: Sender,
    /// Length in characters
    pub chars: usize,
    /// The message
    pub text: String,
}

impl From<&NormalizedMessage> for LongestMessage {
    fn from(message: &NormalizedMessage) -> Self {
        Self {
            instant: message.instant,
            sender: message.sender,
            chars: message.char_len,
            text: message.text.clone(),
        }
    }
}

/// The summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WrappedStats {
    /// All messages
    pub total_messages: usize,
    /// All words
    pub total_words: usize,
    /// Your totals
    pub you: SenderTotals,
    /// Their totals
    pub them: SenderTotals,
    /// Number of conversations
    pub conversations: usize,
    /// Day with the most messages; ties go to the earliest day
    pub most_active_day: Option<MostActiveDay>,
    /// Longest message overall
    pub longest: Option<LongestMessage>,
    /// Your longest message
    pub longest_you: Option<LongestMessage>,
    /// Their longest message
    pub longest_them: Option<LongestMessage>,
    /// Longest messages, longest first
    pub leaderboard: Vec<LongestMessage>,
    /// Most used emoji across both senders
    pub top_emoji: Vec<EmojiCount>,
    /// Conversation enders
    pub enders: SenderCounts,
    /// Double-texts
    pub double_texts: SenderCounts,
}

/// Ranks longer first, then earlier position first
type RankKey = (usize, Reverse<usize>);

/// Collects the summary in one pass
#[derive(Debug, Clone, Copy)]
pub struct WrappedStatsCollector {
    leaderboard_size: usize,
}

impl Default for WrappedStatsCollector {
    fn default() -> Self {
        Self::new(DEFAULT_LEADERBOARD_SIZE)
    }
}

impl WrappedStatsCollector {
    /// Collector keeping `leaderboard_size` longest messages
    #[must_use]
    pub const fn new(leaderboard_size: usize) -> Self {
        Self { leaderboard_size }
    }

    /// Summarize `messages`, folding in the reply-ladder and emoji outputs
    #[must_use]
    pub fn collect(
        &self,
        messages: &[NormalizedMessage],
        conversations: usize,
        ladder: &ReplyLadder,
        top_emoji: &[EmojiCount],
    ) -> WrappedStats {
        let mut totals = [SenderTotals::default(); 2];
        let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        let mut longest: Option<usize> = None;
        let mut longest_by_sender: [Option<usize>; 2] = [None, None];
        let mut board: BinaryHeap<Reverse<RankKey>> = BinaryHeap::with_capacity(self.leaderboard_size + 1);

        for (index, message) in messages.iter().enumerate() {
            let slot = message.sender.index();
            totals[slot].messages += 1;
            totals[slot].words += message.word_count;
            *per_day.entry(message.date).or_default() += 1;

            if is_longer(messages, index, longest) {
                longest = Some(index);
            }
            if is_longer(messages, index, longest_by_sender[slot]) {
                longest_by_sender[slot] = Some(index);
            }

            if self.leaderboard_size > 0 {
                board.push(Reverse((message.char_len, Reverse(index))));
                if board.len() > self.leaderboard_size {
                    board.pop();
                }
            }
        }

        let mut ranked: Vec<RankKey> = board.into_iter().map(|Reverse(key)| key).collect();
        ranked.sort_unstable_by(|a, b| b.cmp(a));

        let at = |index: Option<usize>| index.map(|i| LongestMessage::from(&messages[i]));
        let [you, them] = totals;

        WrappedStats {
            total_messages: messages.len(),
            total_words: you.words + them.words,
            you,
            them,
            conversations,
            most_active_day: most_active_day(&per_day),
            longest: at(longest),
            longest_you: at(longest_by_sender[Sender::Me.index()]),
            longest_them: at(longest_by_sender[Sender::Them.index()]),
            leaderboard: ranked
                .into_iter()
                .map(|(_, Reverse(index))| LongestMessage::from(&messages[index]))
                .collect(),
            top_emoji: top_emoji.to_vec(),
            enders: ladder.enders,
            double_texts: ladder.double_texts,
        }
    }
}

fn is_longer(messages: &[NormalizedMessage], candidate: usize, current: Option<usize>) -> bool {
    current.map_or(true, |best| messages[candidate].char_len > messages[best].char_len)
}

fn most_active_day(per_day: &BTreeMap<NaiveDate, usize>) -> Option<MostActiveDay> {
    per_day
        .iter()
        .fold(None, |best: Option<MostActiveDay>, (&date, &messages)| match best {
            Some(current) if current.messages >= messages => Some(current),
            _ => Some(MostActiveDay { date, messages }),
        })
}
