//! Translator trait.

use async_trait::async_trait;

use crate::error::Result;

/// Best-effort document translation. Callers treat any error as
/// "keep the source text".
#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &str;

    async fn translate(&self, text: &str, target_lang: &str) -> Result<String>;
}
