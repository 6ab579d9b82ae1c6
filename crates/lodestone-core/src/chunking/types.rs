//! Types produced by chunking strategies.

/// A contiguous window of a source document's text.
///
/// Chunks are derived data: they are regenerated whenever the source text
/// or the chunking parameters change, and are never edited in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Position of this chunk within the source document (0-indexed).
    pub index: usize,
    /// Total number of chunks produced from the source document.
    pub count: usize,
    /// Window text.
    pub text: String,
}
