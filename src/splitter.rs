use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// Break points in order of preference: paragraph, line, sentence, word.
/// When none fits inside the window the text is cut at the size limit.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "! ", "? ", " "];

/// Splits text into overlapping chunks of at most `chunk_size` characters.
///
/// Each chunk ends right after the last occurrence of the most preferred
/// separator that fits in the window, and the next chunk starts exactly
/// `chunk_overlap` characters before that end. Dropping the first
/// `chunk_overlap` characters of every chunk but the first and
/// concatenating therefore reproduces the input.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::Config("chunk size must be positive".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::Config(format!(
                "chunk overlap ({chunk_overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn split_document(&self, document: &Document) -> Vec<Chunk> {
        self.split_text(&document.text)
            .into_iter()
            .map(|(offset, text)| Chunk {
                text,
                source_id: document.source_id.clone(),
                offset,
            })
            .collect()
    }

    /// Returns `(character offset, text)` pairs in document order.
    pub fn split_text(&self, text: &str) -> Vec<(usize, String)> {
        if text.is_empty() {
            return Vec::new();
        }

        // bounds[i] is the byte index of character i; the last entry is text.len().
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = bounds.len() - 1;

        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            if total - start <= self.chunk_size {
                chunks.push((start, text[bounds[start]..].to_string()));
                break;
            }

            let end = self.find_end(text, &bounds, start);
            chunks.push((start, text[bounds[start]..bounds[end]].to_string()));
            start = end - self.chunk_overlap;
        }

        chunks
    }

    // Picks the end (exclusive, in characters) of the chunk starting at `start`.
    // The end must leave the next chunk starting strictly after `start`.
    fn find_end(&self, text: &str, bounds: &[usize], start: usize) -> usize {
        let limit = start + self.chunk_size;
        let min_end = start + self.chunk_overlap + 1;
        let window_start = bounds[start];
        let window = &text[window_start..bounds[limit]];

        for separator in DEFAULT_SEPARATORS {
            let Some(pos) = window.rfind(separator) else {
                continue;
            };
            let end_byte = window_start + pos + separator.len();
            if let Ok(end) = bounds.binary_search(&end_byte) {
                if end >= min_end {
                    return end;
                }
            }
        }

        limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(chunks: &[(usize, String)], overlap: usize) -> String {
        let mut out = String::new();
        for (i, (_, chunk)) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(chunk);
            } else {
                out.extend(chunk.chars().skip(overlap));
            }
        }
        out
    }

    fn sample_speech() -> String {
        let paragraph = "The true remedy lies in the destruction of the belief in the sanctity \
            of the shastras. How do you expect to succeed if you allow the shastras to \
            continue to mould the beliefs and opinions of the people? Your real enemy is \
            the belief in the shastras!";
        format!("{paragraph}\n\n{paragraph}\n{paragraph}\n\n{paragraph} {paragraph}")
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let splitter = TextSplitter::new(500, 50).unwrap();
        let chunks = splitter.split_text("The sky is blue.");
        assert_eq!(chunks, vec![(0, "The sky is blue.".to_string())]);
    }

    #[test]
    fn test_text_of_exact_chunk_size_is_single_chunk() {
        let splitter = TextSplitter::new(10, 2).unwrap();
        let chunks = splitter.split_text("abcdefghij");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        let splitter = TextSplitter::new(500, 50).unwrap();
        assert!(splitter.split_text("").is_empty());
    }

    #[test]
    fn test_reconstructs_original_text() {
        let text = sample_speech();
        let splitter = TextSplitter::new(120, 20).unwrap();
        let chunks = splitter.split_text(&text);
        assert!(chunks.len() > 1);
        assert_eq!(reconstruct(&chunks, 20), text);
    }

    #[test]
    fn test_adjacent_chunks_share_exact_overlap() {
        let text = sample_speech();
        let splitter = TextSplitter::new(100, 15).unwrap();
        let chunks = splitter.split_text(&text);

        for pair in chunks.windows(2) {
            let (_, prev) = &pair[0];
            let (next_offset, next) = &pair[1];
            let prev_chars: Vec<char> = prev.chars().collect();
            let tail: String = prev_chars[prev_chars.len() - 15..].iter().collect();
            let head: String = next.chars().take(15).collect();
            assert_eq!(tail, head);

            let (prev_offset, _) = &pair[0];
            assert_eq!(*next_offset, prev_offset + prev_chars.len() - 15);
        }
    }

    #[test]
    fn test_chunks_never_exceed_size() {
        let text = sample_speech();
        let splitter = TextSplitter::new(80, 10).unwrap();
        for (_, chunk) in splitter.split_text(&text) {
            assert!(chunk.chars().count() <= 80, "chunk too long: {chunk:?}");
        }
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let text = format!("{}\n\n{}", "a".repeat(30), "b ".repeat(30));
        let splitter = TextSplitter::new(50, 5).unwrap();
        let chunks = splitter.split_text(&text);
        assert!(chunks[0].1.ends_with("\n\n"));
        assert_eq!(chunks[0].1.chars().count(), 32);
    }

    #[test]
    fn test_prefers_word_breaks_over_raw_cuts() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let splitter = TextSplitter::new(20, 3).unwrap();
        let chunks = splitter.split_text(text);
        assert!(chunks[0].1.ends_with(' '));
        assert_eq!(reconstruct(&chunks, 3), text);
    }

    #[test]
    fn test_unbreakable_word_is_cut_at_limit() {
        let text = "x".repeat(25);
        let splitter = TextSplitter::new(10, 2).unwrap();
        let chunks = splitter.split_text(&text);
        assert_eq!(chunks[0].1.len(), 10);
        assert_eq!(chunks[1].0, 8);
        assert_eq!(reconstruct(&chunks, 2), text);
    }

    #[test]
    fn test_multibyte_text() {
        let text = "héllo wörld ünïcödé テキスト 分割 テスト ".repeat(6);
        let splitter = TextSplitter::new(25, 4).unwrap();
        let chunks = splitter.split_text(&text);
        assert!(chunks.iter().all(|(_, c)| c.chars().count() <= 25));
        assert_eq!(reconstruct(&chunks, 4), text);
    }

    #[test]
    fn test_deterministic() {
        let text = sample_speech();
        let splitter = TextSplitter::new(90, 12).unwrap();
        assert_eq!(splitter.split_text(&text), splitter.split_text(&text));
    }

    #[test]
    fn test_split_document_keeps_source() {
        let splitter = TextSplitter::new(500, 50).unwrap();
        let doc = Document {
            text: "One chunk only.".to_string(),
            source_id: "speech.txt".to_string(),
        };
        let chunks = splitter.split_document(&doc);
        assert_eq!(
            chunks,
            vec![Chunk {
                text: "One chunk only.".to_string(),
                source_id: "speech.txt".to_string(),
                offset: 0,
            }]
        );
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(TextSplitter::new(10, 10).is_err());
        assert!(TextSplitter::new(0, 0).is_err());
    }
}
