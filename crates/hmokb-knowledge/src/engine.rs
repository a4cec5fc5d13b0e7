//! `KnowledgeBase`: the build and query facade.
//!
//! Owns the builder, the store and one published snapshot per variant.
//! Searches clone the snapshot `Arc` and rank without holding any lock; a
//! finished build swaps in new snapshots, so in-flight searches finish on
//! the generation they started with.

use crate::builder::{BuildSummary, IndexBuilder};
use crate::cache::{FileTranslationCache, TranslationCache};
use crate::canon::AttributeFilter;
use crate::search::{self, DualResults};
use crate::store::{IndexCorpus, IndexStore, VariantStatus};
use hmokb_core::config::IndexConfig;
use hmokb_core::error::{HmoKbError, Result};
use hmokb_core::traits::{Embedder, Translator};
use hmokb_core::types::{Hit, Variant};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

type Snapshot = RwLock<Option<Arc<IndexCorpus>>>;

pub struct KnowledgeBase {
    builder: IndexBuilder,
    store: IndexStore,
    embedder: Arc<dyn Embedder>,
    build_lock: Mutex<()>,
    /// Held shared while loading from the store, exclusively while a build
    /// writes to it.
    files: RwLock<()>,
    original: Snapshot,
    translated: Snapshot,
}

impl KnowledgeBase {
    /// Knowledge base over `config.data_dir`, persisting to `config.index_dir`.
    pub fn new(
        config: &IndexConfig,
        embedder: Arc<dyn Embedder>,
        translator: Option<Arc<dyn Translator>>,
    ) -> Result<Self> {
        let index_root = config.index_root();
        let cache = Arc::new(FileTranslationCache::new(&index_root.join("translated_cache")));
        Self::with_cache(config, embedder, translator, cache)
    }

    pub fn with_cache(
        config: &IndexConfig,
        embedder: Arc<dyn Embedder>,
        translator: Option<Arc<dyn Translator>>,
        cache: Arc<dyn TranslationCache>,
    ) -> Result<Self> {
        let builder = IndexBuilder::new(
            &config.document_root(),
            &config.target_language,
            embedder.clone(),
            translator,
            cache,
        )?;
        Ok(Self {
            builder,
            store: IndexStore::new(&config.index_root()),
            embedder,
            build_lock: Mutex::new(()),
            files: RwLock::new(()),
            original: RwLock::new(None),
            translated: RwLock::new(None),
        })
    }

    fn slot(&self, variant: Variant) -> &Snapshot {
        match variant {
            Variant::Original => &self.original,
            Variant::Translated => &self.translated,
        }
    }

    /// Full rebuild of both variants. A second build while one is running
    /// is rejected with [`HmoKbError::BuildInProgress`].
    pub async fn build(&self) -> Result<BuildSummary> {
        let _guard = self
            .build_lock
            .try_lock()
            .map_err(|_| HmoKbError::BuildInProgress)?;

        let built = self.builder.prepare().await?;
        {
            let _files = self.files.write().await;
            built.persist(&self.store)?;
        }
        *self.original.write().await = Some(Arc::new(built.original));
        *self.translated.write().await = Some(Arc::new(built.translated));
        tracing::info!("🔄 Published new index snapshots");
        Ok(built.summary)
    }

    /// Current snapshot of `variant`, loading it from the store on first use.
    pub async fn snapshot(&self, variant: Variant) -> Result<Arc<IndexCorpus>> {
        if let Some(corpus) = self.slot(variant).read().await.as_ref() {
            return Ok(corpus.clone());
        }

        let mut slot = self.slot(variant).write().await;
        if let Some(corpus) = slot.as_ref() {
            return Ok(corpus.clone());
        }
        let store = self.store.clone();
        let corpus = {
            let _files = self.files.read().await;
            tokio::task::spawn_blocking(move || store.load(variant))
                .await
                .map_err(|e| HmoKbError::Store(format!("index load task failed: {e}")))??
        };
        let corpus = Arc::new(corpus);
        *slot = Some(corpus.clone());
        tracing::info!("📂 Loaded {variant} index ({} entries)", corpus.len());
        Ok(corpus)
    }

    /// Embed the query and check it lives in the corpus's vector space.
    async fn embed_query(&self, query: &str, corpus: &IndexCorpus) -> Result<Vec<f32>> {
        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(HmoKbError::Gateway(format!(
                "expected 1 query embedding, got {}",
                vectors.len()
            )));
        }
        let vector = vectors.remove(0);
        if !corpus.is_empty() && vector.len() != corpus.dim() {
            return Err(HmoKbError::Gateway(format!(
                "query embedding has dimension {}, index has {}",
                vector.len(),
                corpus.dim()
            )));
        }
        Ok(vector)
    }

    /// Top-`k` entries of the whole corpus.
    pub async fn search_broad(&self, query: &str, variant: Variant, k: usize) -> Result<Vec<Hit>> {
        let corpus = self.snapshot(variant).await?;
        let vector = self.embed_query(query, &corpus).await?;
        Ok(search::search_broad(&corpus, &vector, k))
    }

    /// Top-`k` table cells matching `filter` exactly. No matching cells
    /// means `Ok(vec![])`, without an embedding call.
    pub async fn search_filtered(
        &self,
        query: &str,
        variant: Variant,
        filter: &AttributeFilter,
        k: usize,
    ) -> Result<Vec<Hit>> {
        let corpus = self.snapshot(variant).await?;
        let candidates = search::filtered_candidates(&corpus, filter);
        if candidates.is_empty() {
            tracing::debug!(
                "No {variant} entries for ({}, {})",
                filter.organization(),
                filter.tier()
            );
            return Ok(Vec::new());
        }
        let vector = self.embed_query(query, &corpus).await?;
        Ok(search::search_candidates(&corpus, &vector, &candidates, k))
    }

    /// Broad and filtered results from one query embedding. The two lists
    /// are independent and may share entries.
    pub async fn search_dual(
        &self,
        query: &str,
        filter: &AttributeFilter,
        k_broad: usize,
        k_filtered: usize,
        variant: Variant,
    ) -> Result<DualResults> {
        let corpus = self.snapshot(variant).await?;
        let vector = self.embed_query(query, &corpus).await?;
        let candidates = search::filtered_candidates(&corpus, filter);

        let results = DualResults {
            broad: search::search_broad(&corpus, &vector, k_broad),
            filtered: search::search_candidates(&corpus, &vector, &candidates, k_filtered),
        };
        tracing::debug!(
            "🔍 {variant} search: {} broad, {} filtered hits",
            results.broad.len(),
            results.filtered.len()
        );
        Ok(results)
    }

    pub fn status(&self) -> Vec<VariantStatus> {
        self.store.status()
    }
}
