//! Printable ASCII run scan
//!
//! Typed-stream payloads keep the message body as a length-prefixed byte run
//! surrounded by class names. Runs are collected, metadata is discarded and
//! fragments split by non-ASCII characters are rejoined pairwise.

use std::collections::HashSet;

use super::{is_metadata_token, longest, DecodeDiagnostics};

const MIN_RUN: usize = 2;

/// Shortest trailing fragment that may be glued onto the previous one
const MIN_JOIN_FRAGMENT: usize = 3;

pub(super) fn attempt(buffer: &[u8], diagnostics: &mut DecodeDiagnostics) -> Option<String> {
    let runs = printable_runs(buffer);
    diagnostics.strings_found = runs.len();

    let mut seen = HashSet::new();
    let unique: Vec<String> = runs
        .into_iter()
        .map(strip_length_prefix)
        .filter(|run| seen.insert(run.clone()))
        .collect();
    diagnostics.unique_strings = unique.len();

    let meaningful: Vec<String> = unique
        .into_iter()
        .filter(|run| run.len() >= MIN_RUN && !is_metadata_token(run.trim()))
        .collect();
    diagnostics.meaningful_strings = meaningful.len();

    let mut candidates = meaningful.clone();
    candidates.extend(
        meaningful
            .windows(2)
            .filter(|pair| looks_split(&pair[0], &pair[1]))
            .map(|pair| format!("{}{}", pair[0], pair[1])),
    );

    let spaced = candidates
        .iter()
        .map(String::as_str)
        .filter(|c| c.contains(' '));
    longest(spaced)
        .or_else(|| longest(candidates.iter().map(String::as_str)))
        .map(str::to_string)
}

fn printable_runs(buffer: &[u8]) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();

    for &byte in buffer {
        if (0x20..=0x7E).contains(&byte) {
            current.push(char::from(byte));
        } else {
            if current.len() >= MIN_RUN {
                runs.push(current.clone());
            }
            current.clear();
        }
    }
    if current.len() >= MIN_RUN {
        runs.push(current);
    }

    runs
}

/// Drop a `+<len>` typed-stream prefix when the length byte matches the rest
fn strip_length_prefix(run: String) -> String {
    let bytes = run.as_bytes();
    if bytes.len() > 2 && bytes[0] == b'+' && usize::from(bytes[1]) == bytes.len() - 2 {
        run[2..].to_string()
    } else {
        run
    }
}

fn looks_split(first: &str, next: &str) -> bool {
    let joins_after = first
        .chars()
        .last()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '\'' || c == ' ');
    let continues = next.chars().next().is_some_and(|c| c.is_ascii_lowercase());
    joins_after && continues && next.len() >= MIN_JOIN_FRAGMENT
}
