//! Conversation segmentation by inactivity gap

use chrono::Duration;
use serde::Serialize;

use crate::models::{NormalizedMessage, Sender, SenderCounts};

/// Default gap that starts a new conversation
pub const DEFAULT_CONVERSATION_GAP_HOURS: i64 = 24;

/// A maximal run of messages with no internal gap at or above the threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversation<'a> {
    messages: &'a [NormalizedMessage],
}

impl<'a> Conversation<'a> {
    /// Messages in order; never empty
    #[must_use]
    pub const fn messages(&self) -> &'a [NormalizedMessage] {
        self.messages
    }

    /// Number of messages
    #[must_use]
    pub const fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the conversation holds no messages
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// First message
    #[must_use]
    pub fn first(&self) -> &'a NormalizedMessage {
        &self.messages[0]
    }

    /// Last message
    #[must_use]
    pub fn last(&self) -> &'a NormalizedMessage {
        &self.messages[self.messages.len() - 1]
    }

    /// Sender of the final message
    #[must_use]
    pub fn ender(&self) -> Sender {
        self.last().sender
    }
}

/// Serializable summary of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationSummary {
    /// Instant of the first message
    pub started: chrono::DateTime<chrono::Utc>,
    /// Instant of the last message
    pub ended: chrono::DateTime<chrono::Utc>,
    /// Message count
    pub messages: usize,
    /// Who sent the last message
    pub ender: Sender,
}

impl From<Conversation<'_>> for ConversationSummary {
    fn from(conversation: Conversation<'_>) -> Self {
        Self {
            started: conversation.first().instant,
            ended: conversation.last().instant,
            messages: conversation.len(),
            ender: conversation.ender(),
        }
    }
}

/// Splits a chronological message sequence into conversations
#[derive(Debug, Clone, Copy)]
pub struct ConversationSegmenter {
    gap: Duration,
}

impl Default for ConversationSegmenter {
    fn default() -> Self {
        Self::new(Duration::hours(DEFAULT_CONVERSATION_GAP_HOURS))
    }
}

impl ConversationSegmenter {
    /// Segmenter with a custom gap
    #[must_use]
    pub const fn new(gap: Duration) -> Self {
        Self { gap }
    }

    /// Partition `messages` exactly; each message lands in one conversation.
    #[must_use]
    pub fn segment<'a>(&self, messages: &'a [NormalizedMessage]) -> Vec<Conversation<'a>> {
        let mut conversations = Vec::new();
        let mut start = 0;

        for i in 1..messages.len() {
            if messages[i].instant - messages[i - 1].instant >= self.gap {
                conversations.push(Conversation { messages: &messages[start..i] });
                start = i;
            }
        }
        if start < messages.len() {
            conversations.push(Conversation { messages: &messages[start..] });
        }

        conversations
    }
}

/// Tally the final sender of each conversation
#[must_use]
pub fn ender_counts(conversations: &[Conversation<'_>]) -> SenderCounts {
    conversations
        .iter()
        .fold(SenderCounts::default(), |mut counts, conversation| {
            counts.add(conversation.ender());
            counts
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::MessageNormalizer;
    use chrono::{TimeZone, Utc};

    fn message(normalizer: &MessageNormalizer, hours: i64, sender: Sender) -> NormalizedMessage {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        normalizer.derive(base + Duration::hours(hours), "hi".into(), sender)
    }

    #[test]
    fn test_gap_of_exactly_threshold_splits() {
        let n = MessageNormalizer::default();
        let messages = vec![
            message(&n, 0, Sender::Me),
            message(&n, 23, Sender::Them),
            message(&n, 47, Sender::Me),
            message(&n, 50, Sender::Them),
        ];

        let conversations = ConversationSegmenter::default().segment(&messages);
        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0].len(), 2);
        assert_eq!(conversations[1].len(), 2);
        assert_eq!(conversations[0].ender(), Sender::Them);
    }

    #[test]
    fn test_empty_input_yields_no_conversations() {
        assert!(ConversationSegmenter::default().segment(&[]).is_empty());
    }

    #[test]
    fn test_ender_tally() {
        let n = MessageNormalizer::default();
        let messages = vec![
            message(&n, 0, Sender::Me),
            message(&n, 30, Sender::Me),
            message(&n, 60, Sender::Them),
        ];

        let conversations = ConversationSegmenter::default().segment(&messages);
        let enders = ender_counts(&conversations);
        assert_eq!(enders, SenderCounts { you: 2, them: 1 });
        assert_eq!(enders.get(Sender::Them), 1);
    }
}
