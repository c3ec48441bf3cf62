//! Response Parser — turns raw model text into `Candidate`s.
//!
//! Strategy: strip code fences, try a strict JSON parse, then fall back to the first
//! balanced `[…]` (batches) or `{…}` (single replies) that parses. Entries without a
//! non-blank title and artist are dropped. Failures are reported, never raised.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::recommend::models::Candidate;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("response was empty")]
    Empty,

    #[error("no JSON {0} found in response")]
    NoJson(&'static str),

    #[error("JSON did not have the expected shape: {0}")]
    Shape(&'static str),

    #[error("no entry carried both a title and an artist")]
    MissingFields,
}

/// Parses a batch reply. On failure logs a warning and returns no candidates.
pub fn parse(raw: &str) -> Vec<Candidate> {
    match try_parse(raw) {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!("Failed to parse generation response ({e}): {}", preview(raw));
            Vec::new()
        }
    }
}

/// Parses a single-song reply. On failure logs a warning and returns `None`.
pub fn parse_single(raw: &str) -> Option<Candidate> {
    match try_parse_single(raw) {
        Ok(candidate) => Some(candidate),
        Err(e) => {
            warn!("Failed to parse re-prompt response ({e}): {}", preview(raw));
            None
        }
    }
}

pub fn try_parse(raw: &str) -> Result<Vec<Candidate>, ParseError> {
    let value = parse_json(raw, b'[', b']', "array")?;
    let items: Vec<&Value> = match &value {
        Value::Array(items) => items.iter().collect(),
        // A lone song, or an object wrapping the list (e.g. {"songs": [...]})
        Value::Object(_) if candidate_from(&value).is_some() => vec![&value],
        Value::Object(map) => match map.values().find_map(Value::as_array) {
            Some(items) => items.iter().collect(),
            None => return Err(ParseError::Shape("expected an array of songs")),
        },
        _ => return Err(ParseError::Shape("expected an array of songs")),
    };

    if items.is_empty() {
        return Ok(Vec::new());
    }

    let candidates: Vec<Candidate> = items.into_iter().filter_map(candidate_from).collect();
    if candidates.is_empty() {
        return Err(ParseError::MissingFields);
    }
    debug!("Parsed {} candidates", candidates.len());
    Ok(candidates)
}

pub fn try_parse_single(raw: &str) -> Result<Candidate, ParseError> {
    let value = parse_json(raw, b'{', b'}', "object")?;
    match &value {
        Value::Object(_) => candidate_from(&value).ok_or(ParseError::MissingFields),
        Value::Array(items) => items
            .iter()
            .find_map(candidate_from)
            .ok_or(ParseError::MissingFields),
        _ => Err(ParseError::Shape("expected a song object")),
    }
}

fn parse_json(raw: &str, open: u8, close: u8, what: &'static str) -> Result<Value, ParseError> {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return Err(ParseError::Empty);
    }
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }
    balanced_spans(text, open, close)
        .find_map(|span| serde_json::from_str::<Value>(span).ok())
        .ok_or(ParseError::NoJson(what))
}

fn candidate_from(value: &Value) -> Option<Candidate> {
    let title = value.get("title")?.as_str()?.trim();
    let artist = value.get("artist")?.as_str()?.trim();
    if title.is_empty() || artist.is_empty() {
        return None;
    }
    Some(Candidate::new(title, artist))
}

/// Strips ```json ... ``` or ``` ... ``` code fences (any language tag) from LLM output.
fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(stripped) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag, if any, up to the end of the opening line.
    let body = match stripped.find('\n') {
        Some(newline) if !stripped[..newline].contains(&['[', '{'][..]) => &stripped[newline + 1..],
        _ => stripped.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    body.trim()
        .strip_suffix("```")
        .map(str::trim)
        .unwrap_or_else(|| body.trim())
}

/// Every balanced `open…close` span in `text`, leftmost first, string-literal aware.
fn balanced_spans(text: &str, open: u8, close: u8) -> impl Iterator<Item = &str> {
    let bytes = text.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(move |&(_, &b)| b == open)
        .filter_map(move |(start, _)| {
            let mut depth = 0usize;
            let mut in_string = false;
            let mut escaped = false;
            for (offset, &b) in bytes[start..].iter().enumerate() {
                if in_string {
                    match b {
                        _ if escaped => escaped = false,
                        b'\\' => escaped = true,
                        b'"' => in_string = false,
                        _ => {}
                    }
                    continue;
                }
                match b {
                    b'"' => in_string = true,
                    _ if b == open => depth += 1,
                    _ if b == close => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(&text[start..=start + offset]);
                        }
                    }
                    _ => {}
                }
            }
            None
        })
}

fn preview(raw: &str) -> String {
    raw.chars().take(120).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_code_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_code_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_code_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_code_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_code_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_code_fences_single_line() {
        assert_eq!(strip_code_fences("```json[1]```"), "[1]");
    }

    #[test]
    fn test_fenced_array_yields_candidate() {
        let candidates = parse("```json\n[{\"title\":\"A\",\"artist\":\"B\"}]\n```");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "A");
        assert_eq!(candidates[0].artist, "B");
    }

    #[test]
    fn test_not_json_is_empty_not_error() {
        assert!(parse("not json").is_empty());
        assert_eq!(try_parse("not json"), Err(ParseError::NoJson("array")));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(try_parse("   "), Err(ParseError::Empty));
        assert!(parse_single("").is_none());
    }

    #[test]
    fn test_fields_are_trimmed_and_album_ignored() {
        let raw = r#"[{"title": "  Hey Jude ", "artist": " The Beatles", "album": "Hey Jude"}]"#;
        let candidates = try_parse(raw).unwrap();
        assert_eq!(candidates[0].title, "Hey Jude");
        assert_eq!(candidates[0].artist, "The Beatles");
    }

    #[test]
    fn test_array_extracted_from_prose() {
        let raw = "Sure! Here are [two] picks:\n[{\"title\": \"So What\", \"artist\": \"Miles Davis\"}, \
                   {\"title\": \"Take Five\", \"artist\": \"Dave Brubeck\"}]\nEnjoy!";
        let candidates = try_parse(raw).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].title, "Take Five");
    }

    #[test]
    fn test_brackets_inside_strings_do_not_confuse_extraction() {
        let raw = "Result: [{\"title\": \"Song [Live]\", \"artist\": \"Band\"}] done";
        let candidates = try_parse(raw).unwrap();
        assert_eq!(candidates[0].title, "Song [Live]");
    }

    #[test]
    fn test_entries_missing_fields_are_dropped() {
        let raw = r#"[{"title": "Only Title"}, {"title": "Full", "artist": "Song"}, {"artist": ""}]"#;
        let candidates = try_parse(raw).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Full");
    }

    #[test]
    fn test_all_entries_missing_fields() {
        assert_eq!(
            try_parse(r#"[{"name": "x"}]"#),
            Err(ParseError::MissingFields)
        );
    }

    #[test]
    fn test_empty_array_is_ok() {
        assert_eq!(try_parse("[]"), Ok(Vec::new()));
    }

    #[test]
    fn test_wrapped_list_is_accepted() {
        let raw = r#"{"songs": [{"title": "Yellow", "artist": "Coldplay"}]}"#;
        assert_eq!(try_parse(raw).unwrap().len(), 1);
    }

    #[test]
    fn test_lone_object_in_batch_is_accepted() {
        let raw = r#"{"title": "Yellow", "artist": "Coldplay", "album": "Parachutes"}"#;
        assert_eq!(try_parse(raw).unwrap()[0].artist, "Coldplay");
    }

    #[test]
    fn test_scalar_json_is_shape_error() {
        assert!(matches!(try_parse("42"), Err(ParseError::Shape(_))));
    }

    #[test]
    fn test_single_object() {
        let candidate = try_parse_single("```json\n{\"title\": \"Yellow\", \"artist\": \"Coldplay\"}\n```").unwrap();
        assert_eq!(candidate, Candidate::new("Yellow", "Coldplay"));
    }

    #[test]
    fn test_single_from_prose() {
        let raw = "Here you go: {\"title\": \"Creep\", \"artist\": \"Radiohead\", \"album\": \"Pablo Honey\"}";
        assert_eq!(try_parse_single(raw).unwrap().title, "Creep");
    }

    #[test]
    fn test_single_accepts_one_element_array() {
        let raw = r#"[{"title": "Creep", "artist": "Radiohead"}]"#;
        assert_eq!(try_parse_single(raw).unwrap().artist, "Radiohead");
    }

    #[test]
    fn test_single_missing_artist() {
        assert_eq!(
            try_parse_single(r#"{"title": "Creep"}"#),
            Err(ParseError::MissingFields)
        );
    }
}
