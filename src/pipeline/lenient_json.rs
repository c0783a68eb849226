//! Lenient decoding of capability JSON output.
//!
//! Extraction backends occasionally return truncated or lightly malformed
//! JSON: an unterminated array, a trailing comma, prose around a fenced
//! block. Repair rules, applied in order:
//!
//! 1. Prefer the content of a ```json fenced block when one exists.
//! 2. Slice from the first `{`/`[` to the last `}`/`]`.
//! 3. Drop trailing commas before closing brackets.
//! 4. If still unbalanced, truncate to the last complete sibling element
//!    and close the remaining open brackets.
//!
//! Per-element array decoding skips elements that fail to deserialize
//! instead of failing the whole array.

use serde::Deserialize;

/// Parse a JSON value out of possibly-messy capability output.
pub fn parse_lenient(raw: &str) -> Option<serde_json::Value> {
    let candidate = extract_candidate(raw)?;

    if let Ok(v) = serde_json::from_str(&candidate) {
        return Some(v);
    }

    let cleaned = strip_trailing_commas(&candidate);
    if let Ok(v) = serde_json::from_str(&cleaned) {
        return Some(v);
    }

    let repaired = close_unbalanced(&cleaned)?;
    serde_json::from_str(&repaired).ok()
}

/// Decode an array leniently - elements that fail to deserialize are
/// skipped, not fatal.
pub fn parse_array_lenient<T: for<'de> Deserialize<'de>>(raw: &str) -> Vec<T> {
    let Some(serde_json::Value::Array(items)) = parse_lenient(raw) else {
        return vec![];
    };
    items
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect()
}

/// Pull the most plausible JSON span out of surrounding prose.
fn extract_candidate(raw: &str) -> Option<String> {
    let text = match raw.find("```json") {
        Some(start) => {
            let body = &raw[start + 7..];
            match body.find("```") {
                Some(end) => &body[..end],
                None => body,
            }
        }
        None => raw,
    };

    let open = text.find(['{', '['])?;
    let close = text.rfind(['}', ']']).map(|i| i + 1).unwrap_or(text.len());
    if close <= open {
        return Some(text[open..].trim().to_string());
    }
    Some(text[open..close].trim().to_string())
}

/// Remove `,` immediately preceding `}` or `]` (whitespace tolerated).
fn strip_trailing_commas(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let chars: Vec<char> = s.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c == ',' {
            let next_meaningful = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next_meaningful, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Truncate to the last complete sibling element, then close whatever
/// brackets remain open. Returns `None` when no complete element exists.
fn close_unbalanced(s: &str) -> Option<String> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    // Byte offset just past the last position where the top-level-so-far
    // structure was balanced after a complete element.
    let mut last_complete = 0usize;
    let mut depth_at_last = 0usize;

    for (i, c) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.last() == Some(&c) {
                    stack.pop();
                    last_complete = i + c.len_utf8();
                    depth_at_last = stack.len();
                } else {
                    // Mismatched close - stop scanning, repair what we have.
                    break;
                }
            }
            _ => {}
        }
    }

    if last_complete == 0 {
        return None;
    }

    let mut repaired = s[..last_complete].to_string();
    // Reconstruct the closers still owed at the truncation point.
    let mut reopen: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for c in s[..last_complete].chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => reopen.push('}'),
            '[' => reopen.push(']'),
            '}' | ']' => {
                reopen.pop();
            }
            _ => {}
        }
    }
    debug_assert_eq!(reopen.len(), depth_at_last);
    for closer in reopen.into_iter().rev() {
        repaired.push(closer);
    }
    Some(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Row {
        name: String,
    }

    // ── Well-formed input ───────────────────────────────

    #[test]
    fn clean_json_passes_through() {
        let v = parse_lenient(r#"{"a": 1}"#).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn fenced_block_preferred() {
        let raw = "Here you go:\n```json\n[{\"name\": \"A\"}]\n```\nanything else";
        let rows: Vec<Row> = parse_array_lenient(raw);
        assert_eq!(rows, vec![Row { name: "A".into() }]);
    }

    // ── Repairs ─────────────────────────────────────────

    #[test]
    fn trailing_comma_removed() {
        let v = parse_lenient(r#"[{"name": "A"}, {"name": "B"},]"#).unwrap();
        assert_eq!(v.as_array().unwrap().len(), 2);
    }

    #[test]
    fn truncated_array_recovers_complete_elements() {
        let raw = r#"[{"name": "A"}, {"name": "B"}, {"na"#;
        let rows: Vec<Row> = parse_array_lenient(raw);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].name, "B");
    }

    #[test]
    fn truncated_nested_object_closed() {
        let raw = r#"{"items": [{"name": "A"}], "meta"#;
        let v = parse_lenient(raw).unwrap();
        assert_eq!(v["items"][0]["name"], "A");
    }

    #[test]
    fn brackets_inside_strings_ignored() {
        let raw = r#"[{"name": "a ] tricky { value"}, {"name": "B"}"#;
        let rows: Vec<Row> = parse_array_lenient(raw);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "a ] tricky { value");
    }

    // ── Element-level leniency ──────────────────────────

    #[test]
    fn bad_elements_skipped() {
        let raw = r#"[{"name": "A"}, {"nome": 3}, {"name": "C"}]"#;
        let rows: Vec<Row> = parse_array_lenient(raw);
        assert_eq!(rows.len(), 2);
    }

    // ── Hopeless input ──────────────────────────────────

    #[test]
    fn prose_without_json_is_none() {
        assert!(parse_lenient("no structured data here").is_none());
        let rows: Vec<Row> = parse_array_lenient("nothing");
        assert!(rows.is_empty());
    }
}
