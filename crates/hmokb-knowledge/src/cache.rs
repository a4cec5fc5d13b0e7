//! Translation cache.
//!
//! Translating a whole document is the slowest step of a build, so each
//! document is translated at most once: the result is stored under a key
//! derived from the document id and reused until the entry is removed.

use hmokb_core::error::Result;
use hmokb_core::traits::Translator;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Storage capability for translated documents, keyed by document id.
pub trait TranslationCache: Send + Sync {
    fn get(&self, doc_id: &str) -> Option<String>;
    fn put(&self, doc_id: &str, text: &str) -> Result<()>;
}

/// Content-addressed key for a document id (SHA-256 hex).
pub fn cache_key(doc_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(doc_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// One file per document under `<index_dir>/translated_cache/`.
pub struct FileTranslationCache {
    dir: PathBuf,
}

impl FileTranslationCache {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn path_for(&self, doc_id: &str) -> PathBuf {
        self.dir.join(format!("{}.html", cache_key(doc_id)))
    }
}

impl TranslationCache for FileTranslationCache {
    fn get(&self, doc_id: &str) -> Option<String> {
        let path = self.path_for(doc_id);
        match std::fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("⚠️ Unreadable translation cache entry {}: {e}", path.display());
                None
            }
        }
    }

    fn put(&self, doc_id: &str, text: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(doc_id);
        let tmp = path.with_extension("html.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &path)?;
        tracing::debug!("💾 Cached translation of {doc_id} at {}", path.display());
        Ok(())
    }
}

/// Return the cached translation of `doc_id`, translating and caching it
/// on a miss. Never fails: without a translator, or when the translator
/// errors, the source text is returned (and nothing is cached, so the next
/// build tries again).
pub async fn get_or_translate(
    cache: &dyn TranslationCache,
    translator: Option<&dyn Translator>,
    doc_id: &str,
    text: &str,
    target_lang: &str,
) -> String {
    if let Some(cached) = cache.get(doc_id) {
        tracing::debug!("♻️ Translation cache hit for {doc_id}");
        return cached;
    }

    let Some(translator) = translator else {
        return text.to_string();
    };

    match translator.translate(text, target_lang).await {
        Ok(translated) => {
            if let Err(e) = cache.put(doc_id, &translated) {
                tracing::warn!("⚠️ Failed to cache translation of {doc_id}: {e}");
            }
            translated
        }
        Err(e) => {
            tracing::warn!("⚠️ Translation of {doc_id} failed, using source text: {e}");
            text.to_string()
        }
    }
}
