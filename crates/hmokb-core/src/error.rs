//! Error taxonomy shared by every HMO-KB crate.
//!
//! Two "empty" outcomes are deliberately different shapes: a search against a
//! variant that was never built is [`HmoKbError::NotFound`], while a strict
//! search with no matching entries is `Ok(vec![])`.

use crate::types::Variant;

#[derive(Debug, thiserror::Error)]
pub enum HmoKbError {
    /// Missing/empty document root, unreadable config, unknown language.
    #[error("Configuration error: {0}")]
    Config(String),

    /// One malformed document. Recovered by the builder.
    #[error("Parse error in {doc}: {reason}")]
    Parse { doc: String, reason: String },

    /// Translator call failed. Recovered by falling back to the source text.
    #[error("Translation error: {0}")]
    Translation(String),

    /// Embedding gateway failed or answered with a malformed payload.
    #[error("Embedding gateway error: {0}")]
    Gateway(String),

    #[error("Index for variant '{0}' not built yet (run a build first)")]
    NotFound(Variant),

    #[error("An index build is already in progress")]
    BuildInProgress,

    /// Persisted index exists but is inconsistent.
    #[error("Index store error: {0}")]
    Store(String),

    #[error("API key missing for provider: {0}")]
    ApiKeyMissing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HmoKbError {
    pub fn parse(doc: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Parse {
            doc: doc.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures the caller may reasonably retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Gateway(_) | Self::BuildInProgress)
    }
}

pub type Result<T> = std::result::Result<T, HmoKbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_mentions_variant() {
        let err = HmoKbError::NotFound(Variant::Translated);
        assert!(err.to_string().contains("translated"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_gateway_is_transient() {
        assert!(HmoKbError::Gateway("timeout".into()).is_transient());
        assert!(!HmoKbError::parse("a.html", "bad").is_transient());
    }
}
