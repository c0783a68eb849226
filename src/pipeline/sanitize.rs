// Sanitize source text before sending it to the extraction capability.
// Removes invisible Unicode, normalizes whitespace, and bounds length.

/// Maximum input length forwarded to a capability call (characters).
const MAX_INPUT_LENGTH: usize = 50_000;

/// Sanitize text for capability consumption: strip invisible characters,
/// normalize whitespace, truncate. Logs when content was dropped.
pub fn sanitize_source_text(raw: &str) -> String {
    let cleaned = remove_invisible_chars(raw);
    let normalized = normalize_whitespace(&cleaned);
    if normalized.len() > MAX_INPUT_LENGTH {
        tracing::warn!(
            original_len = normalized.len(),
            truncated_to = MAX_INPUT_LENGTH,
            "Source text truncated before extraction"
        );
    }
    truncate_to_max_length(&normalized, MAX_INPUT_LENGTH)
}

/// Remove zero-width and directionality-formatting characters.
/// Preserves standard whitespace (space, newline, tab).
fn remove_invisible_chars(text: &str) -> String {
    text.chars()
        .filter(|c| {
            if *c == ' ' || *c == '\n' || *c == '\t' || *c == '\r' {
                return true;
            }
            !matches!(
                *c,
                '\u{200B}'   // Zero-width space
                | '\u{200C}' // Zero-width non-joiner
                | '\u{200D}' // Zero-width joiner
                | '\u{200E}' // Left-to-right mark
                | '\u{200F}' // Right-to-left mark
                | '\u{202A}'..='\u{202E}' // Directional embedding/override
                | '\u{FEFF}' // BOM
            ) && !c.is_control()
        })
        .collect()
}

/// Collapse runs of blank lines and trim trailing space per line.
fn normalize_whitespace(text: &str) -> String {
    let mut out = Vec::new();
    let mut blank_run = 0usize;
    for line in text.lines() {
        let trimmed = line.trim_end();
        if trimmed.trim().is_empty() {
            blank_run += 1;
            if blank_run <= 1 {
                out.push("");
            }
        } else {
            blank_run = 0;
            out.push(trimmed);
        }
    }
    out.join("\n")
}

/// Truncate at a char boundary, never mid-codepoint.
fn truncate_to_max_length(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_width_chars_removed() {
        let dirty = "Fleet\u{200B} Telematics\u{FEFF}";
        assert_eq!(sanitize_source_text(dirty), "Fleet Telematics");
    }

    #[test]
    fn blank_runs_collapsed() {
        let text = "a\n\n\n\nb";
        assert_eq!(sanitize_source_text(text), "a\n\nb");
    }

    #[test]
    fn accented_text_preserved() {
        let text = "Priorità: alta - consulenza €1.500";
        assert_eq!(sanitize_source_text(text), text);
    }

    #[test]
    fn truncation_respects_char_boundary() {
        let long = "é".repeat(MAX_INPUT_LENGTH);
        let out = sanitize_source_text(&long);
        assert!(out.len() <= MAX_INPUT_LENGTH);
        assert!(out.is_char_boundary(out.len()));
    }
}
