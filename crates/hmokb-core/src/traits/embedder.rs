//! Embedding gateway trait.

use async_trait::async_trait;

use crate::error::Result;

/// Batch text → fixed-length vectors.
///
/// Implementations return exactly one vector per input, in input order, and
/// surface transport/auth failures as [`crate::HmoKbError::Gateway`]. No
/// retries happen behind this call.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
