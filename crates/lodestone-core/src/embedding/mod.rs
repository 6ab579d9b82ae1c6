//! External text-embedding capability contract.
//!
//! The core never runs an embedding model itself. Implementations of
//! [`TextEmbedder`] wrap whatever actually produces vectors (a hosted API,
//! a local model runtime) and may be slow, blocking network calls; the core
//! therefore issues at most one call per query and routes every call
//! through the bounded-retry wrapper in [`crate::retry`].

use async_trait::async_trait;

use crate::error::CapabilityError;

/// Trait for the external embedding capability.
///
/// Implementations must be `Send + Sync` so one embedder can serve the
/// build pass and concurrent read-only queries.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Returns the embedding dimension (vector length).
    ///
    /// All vectors produced by this embedder must have this length.
    fn dimension(&self) -> usize;

    /// Produces a fixed-dimension vector for the given text.
    ///
    /// # Errors
    ///
    /// Implementations fail with [`CapabilityError::Failed`] on transport
    /// or model errors. Empty/whitespace input is rejected at the call
    /// boundary via [`validate_embed_input`] and must not reach the
    /// implementation.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError>;
}

/// Validates text before it crosses the embedding boundary.
///
/// # Errors
///
/// Returns [`CapabilityError::InvalidInput`] for empty or whitespace-only
/// text. This is a boundary rejection and is never retried.
pub fn validate_embed_input(text: &str) -> Result<(), CapabilityError> {
    if text.trim().is_empty() {
        return Err(CapabilityError::InvalidInput(
            "embedding input must be non-empty, non-whitespace text".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_whitespace_input() {
        assert!(matches!(
            validate_embed_input(""),
            Err(CapabilityError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_embed_input("  \t\n"),
            Err(CapabilityError::InvalidInput(_))
        ));
    }

    #[test]
    fn accepts_real_text() {
        assert!(validate_embed_input("a bear in london").is_ok());
    }
}
