//! Paragraph-boundary text chunker.
//!
//! Splits long document text into chunks that respect a character budget,
//! preferring `\n\n` paragraph boundaries so each chunk stays semantically
//! coherent. Sized so a chunk plus the extraction prompt template fits the
//! capability's context budget.

use crate::config::CHUNK_TARGET_CHARS;

/// One chunk of document text, with its index for ordered streaming.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub index: usize,
    pub text: String,
}

/// Split `text` into chunks of at most `max_chars`, on paragraph
/// boundaries where possible.
///
/// Guarantees: at least one chunk for non-empty text; contiguous indices
/// from 0; oversized paragraphs hard-split at the nearest newline or space.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<TextChunk> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return vec![];
    }
    if trimmed.len() <= max_chars {
        return vec![TextChunk {
            index: 0,
            text: trimmed.to_string(),
        }];
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut buffer = String::new();

    for paragraph in trimmed.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        if paragraph.len() > max_chars {
            flush(&mut buffer, &mut chunks);
            for piece in hard_split(paragraph, max_chars) {
                chunks.push(piece);
            }
            continue;
        }

        if !buffer.is_empty() && buffer.len() + 2 + paragraph.len() > max_chars {
            flush(&mut buffer, &mut chunks);
        }
        if !buffer.is_empty() {
            buffer.push_str("\n\n");
        }
        buffer.push_str(paragraph);
    }
    flush(&mut buffer, &mut chunks);

    chunks
        .into_iter()
        .enumerate()
        .map(|(index, text)| TextChunk { index, text })
        .collect()
}

/// Chunk with the crate default budget.
pub fn chunk_default(text: &str) -> Vec<TextChunk> {
    chunk_text(text, CHUNK_TARGET_CHARS)
}

fn flush(buffer: &mut String, chunks: &mut Vec<String>) {
    if !buffer.is_empty() {
        chunks.push(std::mem::take(buffer));
    }
}

/// Split an oversized paragraph at newline/space boundaries, or mid-word
/// as a last resort (char-boundary safe).
fn hard_split(paragraph: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = paragraph;
    while rest.len() > max_chars {
        let window = safe_prefix(rest, max_chars);
        let cut = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(window.len());
        pieces.push(rest[..cut].trim().to_string());
        rest = rest[cut..].trim_start();
    }
    if !rest.is_empty() {
        pieces.push(rest.to_string());
    }
    pieces
}

fn safe_prefix(s: &str, max: usize) -> &str {
    let mut end = max.min(s.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_single_chunk() {
        let chunks = chunk_text("Hello world.\n\nSecond paragraph.", 700);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn empty_text_no_chunks() {
        assert!(chunk_text("   ", 100).is_empty());
    }

    #[test]
    fn splits_on_paragraph_boundaries() {
        let text = format!("{}\n\n{}", "a".repeat(60), "b".repeat(60));
        let chunks = chunk_text(&text, 80);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.starts_with('a'));
        assert!(chunks[1].text.starts_with('b'));
    }

    #[test]
    fn indices_contiguous() {
        let text = vec!["p".repeat(50); 10].join("\n\n");
        let chunks = chunk_text(&text, 120);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i);
        }
    }

    #[test]
    fn oversized_paragraph_hard_split() {
        let text = format!("{} {}", "x".repeat(90), "y".repeat(90));
        let chunks = chunk_text(&text, 100);
        assert!(chunks.len() >= 2);
        for c in &chunks {
            assert!(c.text.len() <= 100);
        }
    }

    #[test]
    fn unicode_hard_split_safe() {
        let text = "é".repeat(300);
        let chunks = chunk_text(&text, 100);
        for c in &chunks {
            assert!(c.text.is_char_boundary(c.text.len()));
        }
    }
}
