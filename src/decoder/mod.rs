//! Payload text recovery
//!
//! Message bodies are sometimes stored only in an opaque serialized blob
//! instead of the plain text column. [`decode`] recovers human-readable text
//! from such a blob by walking an ordered ladder of strategies:
//!
//! 1. keyed-container parse (binary/XML property-list archives)
//! 2. printable ASCII run scan with fragment reconstruction
//! 3. UTF-8 sliding window
//! 4. UTF-16LE sliding window
//!
//! The first strategy to yield a plausible string wins; later strategies only
//! run when every earlier one produced nothing. Decoding is a pure function of
//! the input bytes.
//!
//! This is a heuristic recovery tool, not a serialization library.

mod ascii;
mod keyed;
mod window;

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};

/// Longest `NS`/`CF`/`__kIM`-prefixed token still treated as metadata
const SHORT_PREFIXED_TOKEN_MAX: usize = 40;

/// Fixed tokens that appear in archive containers and never carry message text
const METADATA_TOKENS: &[&str] = &[
    "streamtyped",
    "bplist00",
    "NSAttributedString",
    "NSMutableAttributedString",
    "NSObject",
    "NSString",
    "NSMutableString",
    "NSDictionary",
    "NSMutableDictionary",
    "NSArray",
    "NSMutableArray",
    "NSNumber",
    "NSValue",
    "NSData",
    "NSURL",
    "NSKeyedArchiver",
    "NSFont",
    "NSColor",
    "NSParagraphStyle",
    "NSLink",
    "NS.string",
    "NS.objects",
    "NS.keys",
    "NS.bytes",
    "NS.special",
    "NS.rangeval.location",
    "NS.rangeval.length",
    "$null",
    "$objects",
    "$archiver",
    "$version",
    "$top",
    "$class",
    "$classname",
    "$classes",
    "root",
    "__kIMMessagePartAttributeName",
    "__kIMFileTransferGUIDAttributeName",
    "__kIMBaseWritingDirectionAttributeName",
    "__kIMDataDetectedAttributeName",
    "__kIMLinkAttributeName",
    "__kIMMentionConfirmedMention",
    "__kIMOneTimeCodeAttributeName",
    "__kIMCalendarEventAttributeName",
    "__kIMEmojiImageAttributeName",
];

/// Which rung of the ladder recovered the text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeStrategy {
    /// Parsed keyed container
    KeyedContainer,
    /// Printable ASCII run scan
    AsciiScan,
    /// UTF-8 sliding window
    Utf8Window,
    /// UTF-16LE sliding window
    Utf16Window,
}

impl DecodeStrategy {
    /// Stable name for logs and metric labels
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KeyedContainer => "keyed_container",
            Self::AsciiScan => "ascii_scan",
            Self::Utf8Window => "utf8_window",
            Self::Utf16Window => "utf16_window",
        }
    }
}

impl fmt::Display for DecodeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text recovered from a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    /// Trimmed, non-empty text
    pub text: String,
    /// Strategy that produced it
    pub strategy: DecodeStrategy,
}

/// Counts gathered while scanning an undecodable payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecodeDiagnostics {
    /// Printable runs found in the raw bytes
    pub strings_found: usize,
    /// Distinct runs after de-duplication
    pub unique_strings: usize,
    /// Runs left after dropping metadata tokens
    pub meaningful_strings: usize,
}

/// Why a payload yielded no text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Absent or zero-length buffer
    #[error("payload is empty")]
    EmptyPayload,

    /// Every strategy failed
    #[error(
        "no strategy recovered text ({} strings found, {} unique, {} meaningful)",
        diagnostics.strings_found,
        diagnostics.unique_strings,
        diagnostics.meaningful_strings
    )]
    Undecodable {
        /// Scan counts for reporting
        diagnostics: DecodeDiagnostics,
    },
}

type Attempt = fn(&[u8], &mut DecodeDiagnostics) -> Option<String>;

const LADDER: [(DecodeStrategy, Attempt); 4] = [
    (DecodeStrategy::KeyedContainer, keyed::attempt),
    (DecodeStrategy::AsciiScan, ascii::attempt),
    (DecodeStrategy::Utf8Window, window::attempt_utf8),
    (DecodeStrategy::Utf16Window, window::attempt_utf16),
];

/// Recover message text from an opaque payload.
pub fn decode(buffer: &[u8]) -> Result<DecodedText, DecodeError> {
    if buffer.is_empty() {
        return Err(DecodeError::EmptyPayload);
    }

    let mut diagnostics = DecodeDiagnostics::default();
    for (strategy, attempt) in LADDER {
        match attempt(buffer, &mut diagnostics).and_then(plausible) {
            Some(text) => {
                debug!(strategy = %strategy, chars = text.chars().count(), "Payload decoded");
                return Ok(DecodedText { text, strategy });
            },
            None => trace!(strategy = %strategy, "Strategy produced nothing"),
        }
    }

    Err(DecodeError::Undecodable { diagnostics })
}

/// Decode an optional payload column
pub fn decode_optional(payload: Option<&[u8]>) -> Result<DecodedText, DecodeError> {
    payload.map_or(Err(DecodeError::EmptyPayload), decode)
}

fn plausible(text: String) -> Option<String> {
    let trimmed = text.trim();
    trimmed
        .chars()
        .any(char::is_alphanumeric)
        .then(|| trimmed.to_string())
}

/// Container bookkeeping that never carries message text
fn is_metadata_token(token: &str) -> bool {
    if METADATA_TOKENS.contains(&token) {
        return true;
    }

    token.len() <= SHORT_PREFIXED_TOKEN_MAX
        && ["NS", "CF", "__kIM"].iter().any(|prefix| token.starts_with(prefix))
        && !token.contains(char::is_whitespace)
}

/// Candidates that read like prose rather than identifiers
fn looks_like_prose(candidate: &str) -> bool {
    candidate.contains(char::is_whitespace)
        || candidate.chars().any(|c| c.is_ascii_punctuation())
        || candidate.chars().count() > 20
}

/// Longest candidate by characters; ties keep the first seen
fn longest<'a, I>(candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates.into_iter().fold(None, |best, candidate| match best {
        Some(current) if current.chars().count() >= candidate.chars().count() => Some(current),
        _ => Some(candidate),
    })
}
