//! Paragraph-boundary text chunker used by the in-memory store.
//!
//! Paragraphs (separated by blank lines) are packed greedily into chunks of
//! at most `max_tokens * 4` bytes. A paragraph longer than that on its own
//! is hard-split at the last newline or space before the limit, or at the
//! limit itself when there is none. Whitespace-only input yields no chunks.

/// Rough bytes-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

/// Split `text` into chunk strings, in document order.
pub fn chunk_text(text: &str, max_tokens: usize) -> Vec<String> {
    let max_chars = max_tokens.max(1) * CHARS_PER_TOKEN;
    let mut chunks = Vec::new();
    let mut buf = String::new();

    for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let joined_len = if buf.is_empty() {
            para.len()
        } else {
            buf.len() + 2 + para.len()
        };
        if joined_len > max_chars && !buf.is_empty() {
            chunks.push(std::mem::take(&mut buf));
        }

        if para.len() > max_chars {
            chunks.extend(hard_split(para, max_chars));
            continue;
        }

        if !buf.is_empty() {
            buf.push_str("\n\n");
        }
        buf.push_str(para);
    }

    if !buf.is_empty() {
        chunks.push(buf);
    }
    chunks
}

fn hard_split(mut rest: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    while !rest.is_empty() {
        let mut cut = floor_char_boundary(rest, max_chars);
        if cut < rest.len() {
            if let Some(ws) = rest[..cut].rfind(['\n', ' ']) {
                if ws > 0 {
                    cut = ws + 1;
                }
            }
        }
        if cut == 0 {
            // A single char wider than the limit.
            cut = rest.chars().next().map(char::len_utf8).unwrap_or(rest.len());
        }
        let piece = rest[..cut].trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        rest = &rest[cut..];
    }
    pieces
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_text_is_one_chunk() {
        assert_eq!(chunk_text("Hello, world!", 700), vec!["Hello, world!"]);
    }

    #[test]
    fn blank_text_has_no_chunks() {
        assert!(chunk_text("", 700).is_empty());
        assert!(chunk_text("  \n\n \n\n", 700).is_empty());
    }

    #[test]
    fn paragraphs_pack_under_limit() {
        let chunks = chunk_text("First.\n\nSecond.\n\nThird.", 700);
        assert_eq!(chunks, vec!["First.\n\nSecond.\n\nThird."]);
    }

    #[test]
    fn paragraphs_split_over_limit() {
        let text = "This is paragraph one.\n\nThis is paragraph two.\n\nThis is paragraph three.";
        let chunks = chunk_text(text, 6);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1], "This is paragraph two.");
    }

    #[test]
    fn long_paragraph_splits_on_spaces() {
        let text = "word ".repeat(100);
        let chunks = chunk_text(&text, 5);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.len() <= 20, "chunk too long: {:?}", c);
            assert!(!c.starts_with(' ') && !c.ends_with(' '));
        }
    }

    #[test]
    fn multibyte_text_never_splits_inside_a_char() {
        let text = "┌──────────────────┐│ Hello world      │└──────────────────┘";
        let chunks = chunk_text(text, 1);
        assert!(!chunks.is_empty());
        assert_eq!(chunks.concat().replace(' ', ""), text.replace(' ', ""));
    }

    #[test]
    fn deterministic() {
        let text = "Alpha\n\nBeta\n\nGamma\n\nDelta";
        assert_eq!(chunk_text(text, 2), chunk_text(text, 2));
    }
}
