//! Overlapping text chunking
//!
//! Sections are cut into pieces of at most `chunk_size` characters. Cuts
//! prefer natural breaks near the end of the window, in order: sentence
//! enders, then paragraph breaks, then a hard boundary. Each chunk after the
//! first starts with the final `overlap` characters of the previous chunk so
//! no phrase is lost at a cut point.

/// Break patterns in preference order. The cut lands just after the pattern.
const BREAK_PATTERNS: [&str; 4] = [". ", "? ", "! ", "\n\n"];

/// Fraction of the window (from its end) searched for a natural break.
const BREAK_SEARCH_FRACTION: f64 = 0.4;

/// Chunk `text` into overlapping pieces.
///
/// Guarantees: every chunk is at most `chunk_size` characters; each chunk
/// after the first begins with exactly the last `overlap` characters of its
/// predecessor (or fewer when the predecessor is shorter). `overlap` must be
/// smaller than `chunk_size`; settings validation enforces that upstream.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let remaining = chars.len() - start;
        if remaining <= chunk_size {
            push_chunk(&mut chunks, &chars[start..]);
            break;
        }

        let window_end = start + chunk_size;
        let search_from =
            window_end - ((chunk_size as f64 * BREAK_SEARCH_FRACTION) as usize).max(1);
        let cut = find_break(&chars, search_from, window_end).unwrap_or(window_end);

        push_chunk(&mut chunks, &chars[start..cut]);

        // Step back by the overlap so the next chunk repeats the tail of this
        // one; always advance by at least one character.
        start = cut.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

fn push_chunk(chunks: &mut Vec<String>, piece: &[char]) {
    let chunk: String = piece.iter().collect();
    if !chunk.trim().is_empty() {
        chunks.push(chunk);
    }
}

/// Latest natural break in `[search_from, window_end)`, honoring the pattern
/// preference order. Returns the cut position (index just past the pattern).
fn find_break(chars: &[char], search_from: usize, window_end: usize) -> Option<usize> {
    for pattern in BREAK_PATTERNS {
        let pat: Vec<char> = pattern.chars().collect();
        if window_end < pat.len() {
            continue;
        }
        let mut pos = window_end - pat.len();
        loop {
            if chars[pos..pos + pat.len()] == pat[..] {
                return Some(pos + pat.len());
            }
            if pos <= search_from {
                break;
            }
            pos -= 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("Short text.", 500, 100);
        assert_eq!(chunks, vec!["Short text.".to_string()]);
    }

    #[test]
    fn test_empty_text_no_chunks() {
        assert!(chunk_text("", 500, 100).is_empty());
        assert!(chunk_text("   \n  ", 500, 100).is_empty());
    }

    #[test]
    fn test_chunks_respect_max_size() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(40);
        let chunks = chunk_text(&text, 500, 100);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                chunk.chars().count() <= 500,
                "chunk of {} chars exceeds limit",
                chunk.chars().count()
            );
        }
    }

    #[test]
    fn test_adjacent_chunks_overlap_exactly() {
        let text = "word ".repeat(300);
        let chunks = chunk_text(&text, 200, 50);
        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let next: Vec<char> = pair[1].chars().collect();
            let tail: String = prev[prev.len().saturating_sub(50)..].iter().collect();
            let head: String = next[..50.min(next.len())].iter().collect();
            assert_eq!(tail, head, "overlap mismatch between adjacent chunks");
        }
    }

    #[test]
    fn test_prefers_sentence_break() {
        // One sentence boundary sits inside the search window; the cut should
        // land right after it instead of mid-word at the hard boundary.
        let mut text = "a".repeat(380);
        text.push_str(". ");
        text.push_str(&"b".repeat(400));
        let chunks = chunk_text(&text, 500, 100);
        assert!(chunks[0].ends_with(". "), "cut should follow the sentence");
        assert_eq!(chunks[0].chars().count(), 382);
    }

    #[test]
    fn test_paragraph_break_when_no_sentence() {
        let mut text = "a".repeat(400);
        text.push_str("\n\n");
        text.push_str(&"b".repeat(400));
        let chunks = chunk_text(&text, 500, 100);
        assert!(chunks[0].ends_with("\n\n"));
    }

    #[test]
    fn test_hard_cut_without_breaks() {
        let text = "x".repeat(1200);
        let chunks = chunk_text(&text, 500, 100);
        assert_eq!(chunks[0].chars().count(), 500);
        // Hard cut: the next chunk starts 100 chars before the cut.
        assert_eq!(chunks[1].chars().count(), 500);
    }

    #[test]
    fn test_deterministic() {
        let text = "Sentence one. Sentence two. ".repeat(60);
        let a = chunk_text(&text, 500, 100);
        let b = chunk_text(&text, 500, 100);
        assert_eq!(a, b);
    }

    #[test]
    fn test_multibyte_safe() {
        let text = "नमस्ते दुनिया। ".repeat(200);
        let chunks = chunk_text(&text, 300, 60);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 300);
        }
    }
}
