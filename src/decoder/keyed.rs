//! Keyed-container strategy
//!
//! Parses binary or XML property-list archives and harvests string leaves.
//! Object references are followed through the `$objects` table with a visited
//! set, so self-referential archives terminate.

use std::collections::HashSet;
use std::io::Cursor;

use plist::Value;
use thiserror::Error;
use tracing::debug;

use super::{is_metadata_token, longest, looks_like_prose, DecodeDiagnostics};

/// Dictionary keys whose subtrees only describe classes and archive layout
const STRUCTURAL_KEYS: &[&str] = &["$class", "$classname", "$classes", "$archiver", "$version", "$top"];

#[derive(Debug, Error)]
enum ContainerError {
    #[error("no container header")]
    NotAContainer,

    #[error("malformed container: {0}")]
    Malformed(#[from] plist::Error),
}

pub(super) fn attempt(buffer: &[u8], _diagnostics: &mut DecodeDiagnostics) -> Option<String> {
    match harvest(buffer) {
        Ok(candidates) => select(&candidates),
        Err(ContainerError::NotAContainer) => None,
        Err(e) => {
            debug!(error = %e, "Keyed container rejected");
            None
        },
    }
}

fn has_container_header(buffer: &[u8]) -> bool {
    buffer.starts_with(b"bplist") || buffer.windows(6).any(|w| w == b"<plist")
}

fn harvest(buffer: &[u8]) -> Result<Vec<String>, ContainerError> {
    if !has_container_header(buffer) {
        return Err(ContainerError::NotAContainer);
    }

    let root = Value::from_reader(Cursor::new(buffer))?;
    let root_dict = root.as_dictionary();
    let objects: &[Value] = root_dict
        .and_then(|d| d.get("$objects"))
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice);

    // Archives are walked from `$top`; plain property lists from the root.
    let mut stack: Vec<&Value> = match root_dict.and_then(|d| d.get("$top")) {
        Some(top) if !objects.is_empty() => vec![top],
        _ => vec![&root],
    };
    let mut visited: HashSet<u64> = HashSet::new();
    let mut candidates = Vec::new();

    while let Some(node) = stack.pop() {
        match node {
            Value::String(s) => push_candidate(&mut candidates, s),
            Value::Data(bytes) => {
                if let Ok(s) = std::str::from_utf8(bytes) {
                    push_candidate(&mut candidates, s);
                }
            },
            Value::Array(items) => stack.extend(items.iter().rev()),
            Value::Dictionary(dict) => {
                let children: Vec<&Value> = dict
                    .iter()
                    .filter(|(key, _)| !STRUCTURAL_KEYS.contains(&key.as_str()))
                    .map(|(_, value)| value)
                    .collect();
                stack.extend(children.into_iter().rev());
            },
            Value::Uid(uid) => {
                let index = uid.get();
                if visited.insert(index) {
                    if let Some(target) = usize::try_from(index).ok().and_then(|i| objects.get(i)) {
                        stack.push(target);
                    }
                }
            },
            _ => {},
        }
    }

    Ok(candidates)
}

fn push_candidate(candidates: &mut Vec<String>, value: &str) {
    let trimmed = value.trim();
    if trimmed.is_empty() || is_metadata_token(trimmed) {
        return;
    }
    if trimmed.chars().any(char::is_control) {
        return;
    }
    candidates.push(trimmed.to_string());
}

fn select(candidates: &[String]) -> Option<String> {
    let prose = candidates
        .iter()
        .map(String::as_str)
        .filter(|c| looks_like_prose(c));
    longest(prose)
        .or_else(|| longest(candidates.iter().map(String::as_str)))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plist::{Dictionary, Uid};

    fn archive(objects: Vec<Value>) -> Vec<u8> {
        let mut top = Dictionary::new();
        top.insert("root".to_string(), Value::Uid(Uid::new(1)));

        let mut root = Dictionary::new();
        root.insert("$archiver".to_string(), Value::String("NSKeyedArchiver".into()));
        root.insert("$version".to_string(), Value::Integer(100_000_i64.into()));
        root.insert("$top".to_string(), Value::Dictionary(top));
        root.insert("$objects".to_string(), Value::Array(objects));

        let mut out = Vec::new();
        Value::Dictionary(root)
            .to_writer_binary(&mut out)
            .expect("archive should serialize");
        out
    }

    fn string_object(text_uid: u64, class_uid: u64) -> Value {
        let mut dict = Dictionary::new();
        dict.insert("NS.string".to_string(), Value::Uid(Uid::new(text_uid)));
        dict.insert("$class".to_string(), Value::Uid(Uid::new(class_uid)));
        Value::Dictionary(dict)
    }

    fn class_object(name: &str) -> Value {
        let mut dict = Dictionary::new();
        dict.insert("$classname".to_string(), Value::String(name.into()));
        dict.insert(
            "$classes".to_string(),
            Value::Array(vec![Value::String(name.into()), Value::String("NSObject".into())]),
        );
        Value::Dictionary(dict)
    }

    #[test]
    fn test_archive_text_is_recovered() {
        let payload = archive(vec![
            Value::String("$null".into()),
            string_object(2, 3),
            Value::String("dinner at eight?".into()),
            class_object("NSMutableString"),
        ]);

        let mut diagnostics = DecodeDiagnostics::default();
        assert_eq!(
            attempt(&payload, &mut diagnostics).as_deref(),
            Some("dinner at eight?")
        );
    }

    #[test]
    fn test_self_referential_archive_terminates() {
        let mut cyclic = Dictionary::new();
        cyclic.insert("self".to_string(), Value::Uid(Uid::new(1)));
        cyclic.insert("NS.string".to_string(), Value::Uid(Uid::new(2)));

        let payload = archive(vec![
            Value::String("$null".into()),
            Value::Dictionary(cyclic),
            Value::String("still here".into()),
        ]);

        let mut diagnostics = DecodeDiagnostics::default();
        assert_eq!(attempt(&payload, &mut diagnostics).as_deref(), Some("still here"));
    }

    #[test]
    fn test_prose_preferred_over_longer_identifier() {
        let candidates = vec![
            "AbcdefghijklmnopqrstU".to_string(),
            "ok sure".to_string(),
        ];
        // The identifier is longer than 20 characters so it also counts as prose.
        assert_eq!(select(&candidates).as_deref(), Some("AbcdefghijklmnopqrstU"));

        let candidates = vec!["Identifier".to_string(), "ok sure".to_string()];
        assert_eq!(select(&candidates).as_deref(), Some("ok sure"));
    }

    #[test]
    fn test_structural_keys_are_skipped() {
        let mut top = Dictionary::new();
        top.insert("label".to_string(), Value::String("a much longer layout description".into()));

        let mut root = Dictionary::new();
        root.insert("$top".to_string(), Value::Dictionary(top));
        root.insert("$archiver".to_string(), Value::String("custom archiver name here".into()));
        root.insert("body".to_string(), Value::String("see you soon".into()));

        let mut payload = Vec::new();
        Value::Dictionary(root)
            .to_writer_binary(&mut payload)
            .expect("plist should serialize");

        assert_eq!(harvest(&payload).expect("parses"), vec!["see you soon".to_string()]);
    }

    #[test]
    fn test_truncated_container_is_rejected() {
        let payload = b"bplist00\xd4\x01\x02\x03";
        assert!(matches!(harvest(payload), Err(ContainerError::Malformed(_))));

        let mut diagnostics = DecodeDiagnostics::default();
        assert_eq!(attempt(payload, &mut diagnostics), None);
    }

    #[test]
    fn test_non_container_is_skipped() {
        assert!(matches!(
            harvest(b"plain bytes"),
            Err(ContainerError::NotAContainer)
        ));
    }
}
