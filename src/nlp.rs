//! Lexical helpers: word counting, the reaction heuristic, sentiment scoring
//! and message-kind classification.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use stop_words::{get, LANGUAGE};
use unicode_normalization::UnicodeNormalization;

/// Conversational filler that the generic English list misses
const EXTRA_STOP_WORDS: &[&str] = &[
    "im", "ill", "dont", "wont", "cant", "thats", "whats", "wheres", "hows", "whys", "just",
    "like", "get", "got", "going", "come", "see", "know", "think", "want", "need", "make",
    "take", "give", "say", "tell", "ask", "let", "put", "yeah", "yes", "okay",
];

const POSITIVE_WORDS: &[(&str, f32)] = &[
    ("good", 1.0),
    ("great", 1.5),
    ("excellent", 2.0),
    ("amazing", 2.0),
    ("wonderful", 1.8),
    ("fantastic", 1.8),
    ("happy", 1.2),
    ("joy", 1.5),
    ("love", 2.0),
    ("like", 1.0),
    ("best", 1.5),
    ("better", 1.2),
    ("awesome", 1.8),
    ("perfect", 2.0),
    ("beautiful", 1.8),
    ("sweet", 1.2),
    ("cute", 1.2),
    ("adorable", 1.5),
    ("miss", 1.0),
    ("excited", 1.5),
    ("thrilled", 1.8),
    ("grateful", 1.5),
    ("lucky", 1.0),
    ("proud", 1.5),
    ("fun", 1.2),
];

const NEGATIVE_WORDS: &[(&str, f32)] = &[
    ("bad", -1.0),
    ("terrible", -2.0),
    ("awful", -2.0),
    ("horrible", -2.0),
    ("worst", -2.0),
    ("hate", -2.0),
    ("sad", -1.2),
    ("angry", -1.5),
    ("mad", -1.2),
    ("upset", -1.2),
    ("sorry", -0.8),
    ("frustrated", -1.5),
    ("annoyed", -1.2),
    ("worried", -1.2),
    ("anxious", -1.2),
    ("scared", -1.5),
    ("tired", -0.8),
    ("miserable", -1.8),
    ("disappointed", -1.5),
];

const POSITIVE_EMOJI: &[(&str, f32)] = &[("❤", 2.0), ("😍", 2.0), ("😊", 1.5), ("🥰", 2.0)];

const NEGATIVE_EMOJI: &[(&str, f32)] = &[("😢", -1.5), ("😠", -1.5), ("😞", -1.5)];

const INTENSIFIERS: &[(&str, f32)] = &[
    ("very", 1.5),
    ("extremely", 2.0),
    ("incredibly", 2.0),
    ("absolutely", 2.0),
    ("totally", 1.8),
    ("really", 1.3),
    ("so", 1.2),
    ("super", 1.5),
    ("quite", 1.2),
    ("slightly", 0.7),
    ("barely", 0.5),
];

const NEGATIONS: &[&str] = &["not", "no", "never", "nothing", "nobody", "neither", "nor", "don't", "dont", "isn't", "wasn't"];

const SWEET_PHRASES: &[&str] = &[
    "love",
    "miss",
    "beautiful",
    "cute",
    "adorable",
    "sweet",
    "amazing",
    "wonderful",
    "perfect",
    "gorgeous",
    "handsome",
    "pretty",
    "❤️",
    "🥰",
    "😍",
    "💕",
    "💖",
    "thinking of you",
    "wish you were here",
    "can't wait",
    "excited to see",
];

const LOGISTICS_PHRASES: &[&str] = &[
    "when",
    "where",
    "what time",
    "pick up",
    "drop off",
    "meet",
    "location",
    "address",
    "schedule",
    "plan",
    "tomorrow",
    "today",
    "tonight",
    "later",
    "coming",
    "leaving",
    "arrive",
    "be there",
    "on my way",
    "running late",
];

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\w+\b").expect("valid word regex"))
}

fn reaction_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'.+?'").expect("valid reaction regex"))
}

/// Number of `\b\w+\b` tokens
#[must_use]
pub fn count_words(text: &str) -> usize {
    word_re().find_iter(text).count()
}

/// Lower-cased `\b\w+\b` tokens
pub fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    word_re().find_iter(text).map(|m| m.as_str().to_lowercase())
}

/// Tapback-style notification such as `Loved 'see you soon'`.
///
/// Any single-quoted substring matches, so ordinary quoted speech is caught
/// as well.
#[must_use]
pub fn is_reaction_message(text: &str) -> bool {
    reaction_re().is_match(text)
}

/// Compatibility-normalized, lower-cased text for keyword matching
#[must_use]
pub fn fold_for_matching(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

/// Number of phrases that occur in `folded` as substrings
#[must_use]
pub fn phrase_hits(folded: &str, phrases: &[&str]) -> usize {
    phrases.iter().filter(|p| folded.contains(*p)).count()
}

/// English stop words plus conversational filler
#[must_use]
pub fn stop_words() -> &'static HashSet<String> {
    static WORDS: OnceLock<HashSet<String>> = OnceLock::new();
    WORDS.get_or_init(|| {
        get(LANGUAGE::English)
            .iter()
            .map(ToString::to_string)
            .chain(EXTRA_STOP_WORDS.iter().map(ToString::to_string))
            .collect()
    })
}

/// Per-message polarity in [-1, 1]
pub trait SentimentScorer: Send + Sync {
    /// Score one message body
    fn score(&self, text: &str) -> f32;
}

/// Weighted word-list scorer with intensifier and negation handling
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconScorer;

impl LexiconScorer {
    /// Create a scorer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn weight_of(word: &str) -> Option<f32> {
        POSITIVE_WORDS
            .iter()
            .chain(NEGATIVE_WORDS)
            .find(|(w, _)| *w == word)
            .map(|(_, weight)| *weight)
    }

    fn intensity_of(word: &str) -> Option<f32> {
        INTENSIFIERS
            .iter()
            .find(|(w, _)| *w == word)
            .map(|(_, intensity)| *intensity)
    }
}

impl SentimentScorer for LexiconScorer {
    fn score(&self, text: &str) -> f32 {
        let folded = fold_for_matching(text);
        let tokens: Vec<&str> = folded
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
            .filter(|t| !t.is_empty())
            .collect();

        let mut total = 0.0_f32;
        let mut hits = 0_u32;

        for (i, token) in tokens.iter().enumerate() {
            let Some(mut sentiment) = Self::weight_of(token) else {
                continue;
            };

            if let Some(intensity) = i.checked_sub(1).and_then(|p| Self::intensity_of(tokens[p])) {
                sentiment *= intensity;
            }

            // A negation up to two tokens back flips and softens the word.
            let negated = (1..=2)
                .filter_map(|back| i.checked_sub(back))
                .any(|p| NEGATIONS.contains(&tokens[p]));
            if negated {
                sentiment = -sentiment * 0.8;
            }

            total += sentiment;
            hits += 1;
        }

        for (emoji, weight) in POSITIVE_EMOJI.iter().chain(NEGATIVE_EMOJI) {
            let occurrences = folded.matches(emoji).count();
            if occurrences > 0 {
                #[allow(clippy::cast_possible_truncation)]
                let n = occurrences as u32;
                total += weight * n as f32;
                hits += n;
            }
        }

        if hits == 0 {
            0.0
        } else {
            (total / hits as f32).clamp(-1.0, 1.0)
        }
    }
}

/// Coarse intent of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Affectionate or complimentary
    Compliment,
    /// Coordination and planning
    Logistics,
    /// Anything else
    Other,
}

/// Classify by sweet-phrase versus logistics-phrase hits.
///
/// Compliment wins only with a strictly higher, non-zero score.
#[must_use]
pub fn classify_message(text: &str) -> MessageKind {
    let folded = fold_for_matching(text);
    let sweet = phrase_hits(&folded, SWEET_PHRASES);
    let logistics = phrase_hits(&folded, LOGISTICS_PHRASES);

    if sweet > logistics && sweet > 0 {
        MessageKind::Compliment
    } else if logistics > 0 {
        MessageKind::Logistics
    } else {
        MessageKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_words() {
        assert_eq!(count_words("Hello, world! How are you?"), 5);
        assert_eq!(count_words("don't"), 2);
        assert_eq!(count_words("❤️"), 0);
    }

    #[test]
    fn test_reaction_heuristic() {
        assert!(is_reaction_message("Loved 'see you soon'"));
        assert!(is_reaction_message("Reacted 'lol' to your message"));
        assert!(!is_reaction_message("it's fine"));
        assert!(!is_reaction_message("no quotes here"));
    }

    #[test]
    fn test_sentiment_analysis() {
        let scorer = LexiconScorer::new();

        assert!(scorer.score("I love this, it's amazing and wonderful") > 0.0);
        assert!(scorer.score("This is terrible and I hate it") < 0.0);
        assert_eq!(scorer.score("The sky is blue and the grass is green"), 0.0);
    }

    #[test]
    fn test_sentiment_negation_flips() {
        let scorer = LexiconScorer::new();
        assert!(scorer.score("not good") < 0.0);
        assert!(scorer.score("not bad at all") > 0.0);
    }

    #[test]
    fn test_sentiment_is_clamped() {
        let scorer = LexiconScorer::new();
        let score = scorer.score("extremely amazing 😍 🥰");
        assert!((-1.0..=1.0).contains(&score));
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_message_kinds() {
        assert_eq!(classify_message("miss you, you're so cute"), MessageKind::Compliment);
        assert_eq!(classify_message("what time should we meet?"), MessageKind::Logistics);
        assert_eq!(classify_message("love you, see you tonight"), MessageKind::Logistics);
        assert_eq!(classify_message("lol"), MessageKind::Other);
    }

    #[test]
    fn test_stop_words_include_filler() {
        let words = stop_words();
        assert!(words.contains("the"));
        assert!(words.contains("dont"));
        assert!(!words.contains("pineapple"));
    }
}
