//! Overlapping-window text chunking strategies.
//!
//! Chunking gives semantic search finer granularity than whole-document
//! embeddings: each window is embedded separately and scores roll up to the
//! owning document. Two interchangeable strategies are provided behind
//! [`ChunkingStrategy`]:
//!
//! - [`TokenWindowChunker`] - fixed-size windows of whitespace tokens
//! - [`SentenceWindowChunker`] - windows of consecutive sentences
//!
//! Both share window/overlap semantics: consecutive windows advance by
//! `size - overlap` units and share `overlap` units. The constructors
//! reject `overlap >= size` (the stride would be zero and windowing would
//! never terminate).

mod types;

use crate::error::ChunkingError;

pub use types::TextChunk;

/// Trait for text chunking strategies.
///
/// Implementations split text into ordered overlapping windows with
/// explicit position metadata. Empty or whitespace-only input yields an
/// empty chunk list.
pub trait ChunkingStrategy: Send + Sync {
    /// Splits text into chunks according to this strategy.
    ///
    /// Chunks are ordered by their position in the source text, and each
    /// carries its index plus the total chunk count for the text.
    fn chunk(&self, text: &str) -> Vec<TextChunk>;

    /// Returns a human-readable name for this strategy.
    fn name(&self) -> &'static str;
}

/// Validates window parameters: the stride `size - overlap` must be >= 1.
fn validate_window(size: usize, overlap: usize) -> Result<(), ChunkingError> {
    if size <= overlap {
        return Err(ChunkingError::InvalidConfig(format!(
            "window size ({size}) must be greater than overlap ({overlap})"
        )));
    }
    Ok(())
}

/// Windows `units` into overlapping groups joined by single spaces.
///
/// A window starting at `i` is emitted only while `i + overlap` lies inside
/// the unit list; a trailing window that would consist entirely of the
/// previous window's overlap is skipped.
fn windows(units: &[&str], size: usize, overlap: usize) -> Vec<String> {
    let stride = size - overlap;
    let mut out = Vec::new();
    let mut start = 0;
    while start < units.len() {
        if start + overlap < units.len() {
            let end = usize::min(start + size, units.len());
            out.push(units[start..end].join(" "));
        }
        start += stride;
    }
    out
}

fn into_chunks(windows: Vec<String>) -> Vec<TextChunk> {
    let count = windows.len();
    windows
        .into_iter()
        .enumerate()
        .map(|(index, text)| TextChunk { index, count, text })
        .collect()
}

/// Fixed-size windows of whitespace-separated tokens.
#[derive(Debug, Clone)]
pub struct TokenWindowChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TokenWindowChunker {
    /// Creates a token-window chunker.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkingError::InvalidConfig`] when
    /// `chunk_size <= overlap`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        validate_window(chunk_size, overlap)?;
        Ok(Self {
            chunk_size,
            overlap,
        })
    }
}

impl ChunkingStrategy for TokenWindowChunker {
    fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        into_chunks(windows(&tokens, self.chunk_size, self.overlap))
    }

    fn name(&self) -> &'static str {
        "token-window"
    }
}

/// Windows of consecutive sentences.
///
/// Sentences end at `.`, `!`, or `?` followed by whitespace; the terminal
/// punctuation stays with its sentence. Text with no sentence-terminal
/// punctuation is treated as a single sentence.
#[derive(Debug, Clone)]
pub struct SentenceWindowChunker {
    sentence_count: usize,
    overlap: usize,
}

impl SentenceWindowChunker {
    /// Creates a sentence-window chunker.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkingError::InvalidConfig`] when
    /// `sentence_count <= overlap`.
    pub fn new(sentence_count: usize, overlap: usize) -> Result<Self, ChunkingError> {
        validate_window(sentence_count, overlap)?;
        Ok(Self {
            sentence_count,
            overlap,
        })
    }

    /// Creates a chunker with the shipped default window
    /// ([`crate::config::DEFAULT_CHUNK_SENTENCES`] sentences,
    /// [`crate::config::DEFAULT_SENTENCE_OVERLAP`] shared).
    pub fn with_defaults() -> Self {
        // The defaults satisfy the stride precondition (checked in config
        // tests), so construction cannot fail here.
        Self {
            sentence_count: crate::config::DEFAULT_CHUNK_SENTENCES,
            overlap: crate::config::DEFAULT_SENTENCE_OVERLAP,
        }
    }
}

impl ChunkingStrategy for SentenceWindowChunker {
    fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let sentences = split_sentences(text);
        let refs: Vec<&str> = sentences.iter().map(String::as_str).collect();
        into_chunks(windows(&refs, self.sentence_count, self.overlap))
    }

    fn name(&self) -> &'static str {
        "sentence-window"
    }
}

/// Splits text into sentences at `.?!` runs followed by whitespace.
///
/// The whitespace between sentences is consumed; terminal punctuation is
/// kept. A non-empty remainder without terminal punctuation becomes the
/// final sentence.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current);
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_windows_overlap() {
        let chunker = TokenWindowChunker::new(4, 1).expect("valid config");
        let chunks = chunker.chunk("a b c d e f g");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "a b c d");
        assert_eq!(chunks[1].text, "d e f g");
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[1].index, 1);
        assert!(chunks.iter().all(|c| c.count == 2));
    }

    #[test]
    fn trailing_window_inside_previous_overlap_is_skipped() {
        // Tokens: a b c d e. Windows start at 0 and 3; a window at 6 would
        // start past the end. With overlap 2, a start of 3 still sees new
        // tokens (3 + 2 < 5), so it is kept.
        let chunker = TokenWindowChunker::new(5, 2).expect("valid config");
        let chunks = chunker.chunk("a b c d e");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].text, "d e");

        // Four tokens: the window at start 3 would only re-emit overlap
        // (3 + 2 >= 4), so a single window covers the text.
        let chunks = chunker.chunk("a b c d");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "a b c d");
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = TokenWindowChunker::new(4, 1).expect("valid config");
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n ").is_empty());

        let chunker = SentenceWindowChunker::with_defaults();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   ").is_empty());
    }

    #[test]
    fn degenerate_overlap_is_rejected_not_looped() {
        assert!(matches!(
            TokenWindowChunker::new(4, 4),
            Err(ChunkingError::InvalidConfig(_))
        ));
        assert!(matches!(
            TokenWindowChunker::new(2, 5),
            Err(ChunkingError::InvalidConfig(_))
        ));
        assert!(matches!(
            SentenceWindowChunker::new(1, 1),
            Err(ChunkingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_overlap_produces_disjoint_windows() {
        let chunker = TokenWindowChunker::new(2, 0).expect("valid config");
        let chunks = chunker.chunk("a b c d e");
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["a b", "c d", "e"]);
    }

    #[test]
    fn sentences_split_on_terminal_punctuation() {
        let sentences = split_sentences("First one. Second one! Third one? Fourth");
        assert_eq!(
            sentences,
            vec!["First one.", "Second one!", "Third one?", "Fourth"]
        );
    }

    #[test]
    fn text_without_terminal_punctuation_is_one_sentence() {
        let sentences = split_sentences("no punctuation at all here");
        assert_eq!(sentences.len(), 1);

        let chunker = SentenceWindowChunker::new(2, 1).expect("valid config");
        let chunks = chunker.chunk("no punctuation at all here");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "no punctuation at all here");
    }

    #[test]
    fn punctuation_runs_stay_with_their_sentence() {
        let sentences = split_sentences("Really?! Yes. ");
        assert_eq!(sentences, vec!["Really?!", "Yes."]);
    }

    #[test]
    fn sentence_windows_group_and_overlap() {
        let chunker = SentenceWindowChunker::new(2, 1).expect("valid config");
        let chunks = chunker.chunk("A. B. C. D.");
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["A. B.", "B. C.", "C. D."]);
        assert!(chunks.iter().all(|c| c.count == 3));
    }
}
