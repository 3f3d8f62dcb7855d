//! Sliding-window strategies for payloads with no recognizable structure

use std::sync::OnceLock;

use regex::Regex;

use super::{longest, DecodeDiagnostics};

const UTF8_MAX_OFFSET: usize = 16;
const UTF16_MAX_OFFSET: usize = 4;
const UTF16_MIN_RUN: usize = 10;

fn printable_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\p{Cc}\x{FFFD}]{8,}").expect("valid printable-run regex"))
}

fn is_wordy(run: &str) -> bool {
    run.contains(' ') && run.chars().any(char::is_alphabetic)
}

/// Lossy UTF-8 decode at each starting offset; first offset with a hit wins
pub(super) fn attempt_utf8(buffer: &[u8], _diagnostics: &mut DecodeDiagnostics) -> Option<String> {
    (0..UTF8_MAX_OFFSET.min(buffer.len())).find_map(|offset| {
        let decoded = String::from_utf8_lossy(&buffer[offset..]);
        let runs = printable_run_re()
            .find_iter(&decoded)
            .map(|m| m.as_str())
            .filter(|run| is_wordy(run));
        longest(runs).map(str::to_string)
    })
}

/// Little-endian UTF-16 decode at each starting offset
pub(super) fn attempt_utf16(buffer: &[u8], _diagnostics: &mut DecodeDiagnostics) -> Option<String> {
    (0..UTF16_MAX_OFFSET.min(buffer.len())).find_map(|offset| utf16_best_run(&buffer[offset..]))
}

fn utf16_best_run(bytes: &[u8]) -> Option<String> {
    let mut best: Option<String> = None;
    let mut current = String::new();

    for pair in bytes.chunks_exact(2) {
        let unit = u16::from_le_bytes([pair[0], pair[1]]);
        match u8::try_from(unit) {
            Ok(byte) if (0x20..=0x7E).contains(&byte) => current.push(char::from(byte)),
            _ => {
                keep_longer(&mut best, &current);
                current.clear();
            },
        }
    }
    keep_longer(&mut best, &current);

    best
}

fn keep_longer(best: &mut Option<String>, run: &str) {
    if run.len() < UTF16_MIN_RUN || !is_wordy(run) {
        return;
    }
    if best.as_ref().map_or(true, |b| run.len() > b.len()) {
        *best = Some(run.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_window_finds_text_with_multibyte_characters() {
        let mut payload = vec![0x00_u8, 0x9f, 0x01];
        payload.extend_from_slice("café au lait ☕ please".as_bytes());
        payload.push(0x00);

        let mut diagnostics = DecodeDiagnostics::default();
        assert_eq!(
            attempt_utf8(&payload, &mut diagnostics).as_deref(),
            Some("café au lait ☕ please")
        );
    }

    #[test]
    fn test_utf8_window_requires_space_and_letter() {
        let mut diagnostics = DecodeDiagnostics::default();
        assert_eq!(attempt_utf8(b"\x00abcdefghij\x00", &mut diagnostics), None);
        assert_eq!(attempt_utf8(b"\x0012345 678\x00", &mut diagnostics), None);
    }

    #[test]
    fn test_utf16_window_handles_odd_alignment() {
        let mut payload = vec![0x07_u8];
        payload.extend("see you later".encode_utf16().flat_map(u16::to_le_bytes));

        let mut diagnostics = DecodeDiagnostics::default();
        assert_eq!(
            attempt_utf16(&payload, &mut diagnostics).as_deref(),
            Some("see you later")
        );
    }

    #[test]
    fn test_utf16_short_runs_rejected() {
        let payload: Vec<u8> = "hi you".encode_utf16().flat_map(u16::to_le_bytes).collect();
        let mut diagnostics = DecodeDiagnostics::default();
        assert_eq!(attempt_utf16(&payload, &mut diagnostics), None);
    }
}
