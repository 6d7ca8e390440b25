//! Paragraph-boundary text chunker.
//!
//! Splits a working-directory file's text into [`Chunk`]s no longer than
//! roughly `max_tokens`. Paragraphs (`\n\n`) are packed together while they
//! fit; a paragraph that is too long on its own is hard-split at the last
//! newline or space before the limit.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

/// Approximate chars-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

/// Splits `text` into chunks with contiguous indices starting at 0.
/// Blank text produces no chunks.
pub fn chunk_text(file_name: &str, text: &str, max_tokens: usize) -> Vec<Chunk> {
    let max_chars = (max_tokens * CHARS_PER_TOKEN).max(1);
    let mut pieces: Vec<String> = Vec::new();
    let mut buf = String::new();

    for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let joined_len = if buf.is_empty() {
            para.len()
        } else {
            buf.len() + 2 + para.len()
        };
        if joined_len > max_chars && !buf.is_empty() {
            pieces.push(std::mem::take(&mut buf));
        }

        if para.len() > max_chars {
            pieces.extend(split_oversized(para, max_chars));
            continue;
        }

        if !buf.is_empty() {
            buf.push_str("\n\n");
        }
        buf.push_str(para);
    }
    if !buf.is_empty() {
        pieces.push(buf);
    }

    pieces
        .into_iter()
        .enumerate()
        .map(|(i, piece)| make_chunk(file_name, i as i64, piece))
        .collect()
}

fn split_oversized(para: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut remaining = para;
    while !remaining.is_empty() {
        let mut limit = remaining.len().min(max_chars);
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }
        let cut = if limit < remaining.len() {
            remaining[..limit]
                .rfind(['\n', ' '])
                .map(|pos| pos + 1)
                .unwrap_or(limit)
        } else {
            limit
        };
        // A multi-byte first char wider than max_chars still has to advance.
        let cut = if cut == 0 {
            remaining.chars().next().map(char::len_utf8).unwrap_or(1)
        } else {
            cut
        };
        let piece = remaining[..cut].trim();
        if !piece.is_empty() {
            out.push(piece.to_string());
        }
        remaining = &remaining[cut..];
    }
    out
}

fn make_chunk(file_name: &str, index: i64, text: String) -> Chunk {
    let hash = format!("{:x}", Sha256::digest(text.as_bytes()));
    Chunk {
        id: Uuid::new_v4().to_string(),
        file_name: file_name.to_string(),
        chunk_index: index,
        text,
        hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_text_is_one_chunk() {
        let chunks = chunk_text("a.txt", "Hello, world!", 512);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(chunks[0].file_name, "a.txt");
    }

    #[test]
    fn blank_text_has_no_chunks() {
        assert!(chunk_text("a.txt", "", 512).is_empty());
        assert!(chunk_text("a.txt", " \n\n \n", 512).is_empty());
    }

    #[test]
    fn paragraphs_under_limit_are_packed() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = chunk_text("a.txt", text, 512);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("First paragraph."));
        assert!(chunks[0].text.contains("Third paragraph."));
    }

    #[test]
    fn indices_are_contiguous_when_split() {
        let text = (0..50)
            .map(|i| format!("Paragraph number {}.", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = chunk_text("a.txt", &text, 10);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
            assert!(c.text.len() <= 40);
        }
    }

    #[test]
    fn oversized_paragraph_splits_on_spaces() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        // max_tokens=3 => 12 chars
        let chunks = chunk_text("a.txt", text, 3);
        assert!(chunks.len() > 1);
        let rejoined = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(rejoined, text);
    }

    #[test]
    fn multibyte_text_does_not_panic() {
        let text = "ééééééééééééééééééééééé";
        let chunks = chunk_text("a.txt", text, 1);
        assert_eq!(chunks.iter().map(|c| c.text.as_str()).collect::<String>(), text);
    }

    #[test]
    fn hashes_are_deterministic() {
        let text = "Alpha\n\nBeta\n\nGamma\n\nDelta";
        let c1 = chunk_text("a.txt", text, 2);
        let c2 = chunk_text("a.txt", text, 2);
        assert_eq!(c1.len(), c2.len());
        for (a, b) in c1.iter().zip(c2.iter()) {
            assert_eq!(a.text, b.text);
            assert_eq!(a.hash, b.hash);
        }
    }
}
