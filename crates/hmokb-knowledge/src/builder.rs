//! Index builder: documents → entries → embeddings → persisted corpora.
//!
//! Every build rebuilds both variants from scratch. The original corpus is
//! parsed from the documents as found on disk; the translated corpus is
//! parsed from cached (or freshly produced) translations of the same files.

use crate::cache::{TranslationCache, get_or_translate};
use crate::parser::StructuralParser;
use crate::store::{IndexCorpus, IndexStore};
use hmokb_core::error::{HmoKbError, Result};
use hmokb_core::traits::{Embedder, Translator};
use hmokb_core::types::{Entry, EntryKind, Variant};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Outcome of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    pub original_count: usize,
    pub translated_count: usize,
    pub files: usize,
}

/// Corpora produced by a build, ready to be published to readers.
pub struct BuiltIndex {
    pub summary: BuildSummary,
    pub original: IndexCorpus,
    pub translated: IndexCorpus,
}

impl BuiltIndex {
    /// Write both variants. Nothing is written until both are embedded, so a
    /// gateway failure leaves the previous generation untouched.
    pub fn persist(&self, store: &IndexStore) -> Result<()> {
        store.save(Variant::Original, self.original.entries(), self.original.vectors())?;
        store.save(
            Variant::Translated,
            self.translated.entries(),
            self.translated.vectors(),
        )
    }
}

/// A document found under the document root.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Path relative to the document root, `/`-separated.
    pub id: String,
    pub path: PathBuf,
}

pub struct IndexBuilder {
    document_root: PathBuf,
    target_language: String,
    parser: StructuralParser,
    embedder: Arc<dyn Embedder>,
    translator: Option<Arc<dyn Translator>>,
    cache: Arc<dyn TranslationCache>,
}

impl IndexBuilder {
    pub fn new(
        document_root: &Path,
        target_language: &str,
        embedder: Arc<dyn Embedder>,
        translator: Option<Arc<dyn Translator>>,
        cache: Arc<dyn TranslationCache>,
    ) -> Result<Self> {
        Ok(Self {
            document_root: document_root.to_path_buf(),
            target_language: target_language.to_string(),
            parser: StructuralParser::new()?,
            embedder,
            translator,
            cache,
        })
    }

    /// HTML documents under the root, sorted by id.
    pub fn discover(&self) -> Result<Vec<SourceDocument>> {
        discover_documents(&self.document_root)
    }

    /// Parse, translate and embed both variants without touching the store.
    pub async fn prepare(&self) -> Result<BuiltIndex> {
        let documents = self.discover()?;
        tracing::info!(
            "📚 Building index from {} documents in {}",
            documents.len(),
            self.document_root.display()
        );

        let sources: Vec<(String, Option<String>)> = documents
            .iter()
            .map(|doc| (doc.id.clone(), read_document(doc)))
            .collect();

        let original_entries = self.parse_all(
            sources
                .iter()
                .filter_map(|(id, text)| text.as_deref().map(|t| (id.as_str(), t))),
        );
        let original = self.embed(Variant::Original, original_entries).await?;

        let mut translated_sources = Vec::with_capacity(sources.len());
        for (id, text) in &sources {
            let Some(text) = text else { continue };
            let translated = get_or_translate(
                self.cache.as_ref(),
                self.translator.as_deref(),
                id,
                text,
                &self.target_language,
            )
            .await;
            translated_sources.push((id.as_str(), translated));
        }
        let translated_entries = self.parse_all(
            translated_sources
                .iter()
                .map(|(id, text)| (*id, text.as_str())),
        );
        let translated = self.embed(Variant::Translated, translated_entries).await?;

        let summary = BuildSummary {
            original_count: original.len(),
            translated_count: translated.len(),
            files: documents.len(),
        };
        tracing::info!(
            "✅ Index prepared: {} original, {} translated entries from {} files",
            summary.original_count,
            summary.translated_count,
            summary.files
        );
        Ok(BuiltIndex {
            summary,
            original,
            translated,
        })
    }

    /// Parse failures are logged and contribute no entries.
    fn parse_all<'a>(&self, docs: impl Iterator<Item = (&'a str, &'a str)>) -> Vec<Entry> {
        let mut entries = Vec::new();
        for (id, text) in docs {
            match self.parser.parse(id, text) {
                Ok(parsed) => entries.extend(parsed),
                Err(e) => tracing::warn!("⚠️ {e}"),
            }
        }
        entries
    }

    async fn embed(&self, variant: Variant, entries: Vec<Entry>) -> Result<IndexCorpus> {
        let vectors = if entries.is_empty() {
            tracing::warn!("⚠️ No {variant} entries extracted; persisting an empty corpus");
            Vec::new()
        } else {
            let texts: Vec<String> = entries.iter().map(embeddable_text).collect();
            let vectors = self.embedder.embed(&texts).await?;
            check_embeddings(&vectors, entries.len())?;
            vectors
        };
        tracing::debug!("🧮 Embedded {} {variant} entries", entries.len());
        IndexCorpus::new(entries, vectors)
    }
}

/// Text sent to the embedder for an entry.
///
/// Table cells lead with title and row subject so the vector carries what
/// the cell is about; other entries join non-empty title, subtitle and
/// content with `" | "`.
pub fn embeddable_text(entry: &Entry) -> String {
    match (entry.kind, entry.cell()) {
        (EntryKind::TableCell, Some(cell)) => {
            format!("{}\n{}\n{}", entry.title, cell.row, entry.content)
        }
        _ => [
            entry.title.as_str(),
            entry.subtitle.as_deref().unwrap_or(""),
            entry.content.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" | "),
    }
}

fn check_embeddings(vectors: &[Vec<f32>], expected: usize) -> Result<()> {
    if vectors.len() != expected {
        return Err(HmoKbError::Gateway(format!(
            "expected {expected} embeddings, got {}",
            vectors.len()
        )));
    }
    let dim = vectors.first().map(Vec::len).unwrap_or(0);
    if dim == 0 || vectors.iter().any(|v| v.len() != dim) {
        return Err(HmoKbError::Gateway(
            "embeddings have inconsistent dimensionality".into(),
        ));
    }
    Ok(())
}

/// Enumerate `*.html` / `*.htm` files under `root`, sorted by id.
pub fn discover_documents(root: &Path) -> Result<Vec<SourceDocument>> {
    if !root.is_dir() {
        return Err(HmoKbError::Config(format!(
            "document root {} does not exist",
            root.display()
        )));
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() || !is_html(entry.path()) {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let id = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        documents.push(SourceDocument {
            id,
            path: entry.path().to_path_buf(),
        });
    }
    documents.sort_by(|a, b| a.id.cmp(&b.id));

    if documents.is_empty() {
        return Err(HmoKbError::Config(format!(
            "no HTML documents found under {}",
            root.display()
        )));
    }
    Ok(documents)
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
}

/// Unreadable or non-UTF-8 documents are logged and skipped.
fn read_document(doc: &SourceDocument) -> Option<String> {
    match std::fs::read(&doc.path) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(_) => {
                tracing::warn!("⚠️ {}", HmoKbError::parse(&doc.id, "not valid UTF-8"));
                None
            }
        },
        Err(e) => {
            tracing::warn!("⚠️ {}", HmoKbError::parse(&doc.id, e));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FileTranslationCache;
    use crate::test_support::{
        DENTAL_HTML, FailingEmbedder, FailingTranslator, FixedEmbedder, UppercaseTranslator,
        WordHashEmbedder,
    };
    use hmokb_core::types::CellContext;

    impl IndexBuilder {
        async fn build(&self, store: &IndexStore) -> Result<BuiltIndex> {
            let built = self.prepare().await?;
            built.persist(store)?;
            Ok(built)
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        docs: PathBuf,
        index: PathBuf,
    }

    fn fixture(files: &[(&str, &str)]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        for (name, body) in files {
            let path = docs.join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, body).unwrap();
        }
        let index = dir.path().join("index");
        Fixture {
            _dir: dir,
            docs,
            index,
        }
    }

    fn builder(
        fx: &Fixture,
        embedder: Arc<dyn Embedder>,
        translator: Option<Arc<dyn Translator>>,
    ) -> IndexBuilder {
        let cache = Arc::new(FileTranslationCache::new(&fx.index.join("translated_cache")));
        IndexBuilder::new(&fx.docs, "en", embedder, translator, cache).unwrap()
    }

    #[test]
    fn test_embeddable_text_shapes() {
        let cell = Entry::table_cell(
            "a.html",
            "Dental",
            CellContext {
                row: "Checkup".into(),
                column: "מכבי".into(),
                level: "זהב".into(),
            },
            "Free".into(),
        );
        assert_eq!(embeddable_text(&cell), "Dental\nCheckup\nFree");

        let list = Entry::list("a.html", "Dental", Some("Covered".into()), "a \n b".into());
        assert_eq!(embeddable_text(&list), "Dental | Covered | a \n b");

        let untitled = Entry::paragraph("a.html", "", "Intro".into());
        assert_eq!(embeddable_text(&untitled), "Intro");
    }

    #[test]
    fn test_discover_sorted_and_filtered() {
        let fx = fixture(&[
            ("b.html", "<p>b</p>"),
            ("a/nested.HTM", "<p>n</p>"),
            ("notes.txt", "ignored"),
            ("a.html", "<p>a</p>"),
        ]);
        let ids: Vec<String> = discover_documents(&fx.docs)
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["a.html", "a/nested.HTM", "b.html"]);
    }

    #[test]
    fn test_missing_or_empty_root_is_config_error() {
        let fx = fixture(&[("notes.txt", "x")]);
        assert!(matches!(discover_documents(&fx.docs), Err(HmoKbError::Config(_))));
        assert!(matches!(
            discover_documents(&fx.docs.join("missing")),
            Err(HmoKbError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_build_persists_both_variants() {
        let fx = fixture(&[("dental.html", DENTAL_HTML)]);
        let translator = Arc::new(UppercaseTranslator::default());
        let store = IndexStore::new(&fx.index);
        let built = builder(&fx, Arc::new(WordHashEmbedder::default()), Some(translator.clone()))
            .build(&store)
            .await
            .unwrap();

        assert_eq!(built.summary.files, 1);
        assert_eq!(built.summary.original_count, 8);
        assert_eq!(built.summary.translated_count, 8);
        assert_eq!(translator.calls(), 1);
        assert_eq!(built.translated.entries()[0].title, "DENTAL");
        assert_eq!(store.load(Variant::Original).unwrap().len(), 8);
        assert_eq!(store.load(Variant::Translated).unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_rebuild_is_deterministic_and_reuses_cache() {
        let fx = fixture(&[("dental.html", DENTAL_HTML), ("intro.html", "<h2>Intro</h2><p>Hi</p>")]);
        let translator = Arc::new(UppercaseTranslator::default());
        let store = IndexStore::new(&fx.index);
        let b = builder(&fx, Arc::new(WordHashEmbedder::default()), Some(translator.clone()));
        let meta = fx.index.join("original").join("meta.json");
        let translated_meta = fx.index.join("translated").join("meta.json");

        b.build(&store).await.unwrap();
        let first = std::fs::read(&meta).unwrap();
        let first_translated = std::fs::read(&translated_meta).unwrap();
        b.build(&store).await.unwrap();

        assert_eq!(std::fs::read(&meta).unwrap(), first);
        assert_eq!(std::fs::read(&translated_meta).unwrap(), first_translated);
        assert_eq!(translator.calls(), 2, "second build must hit the cache");
    }

    #[tokio::test]
    async fn test_translation_failure_falls_back_to_source() {
        let fx = fixture(&[("dental.html", DENTAL_HTML)]);
        let store = IndexStore::new(&fx.index);
        let built = builder(&fx, Arc::new(WordHashEmbedder::default()), Some(Arc::new(FailingTranslator)))
            .build(&store)
            .await
            .unwrap();
        assert_eq!(built.original.entries(), built.translated.entries());
        assert!(!fx.index.join("translated_cache").exists());
    }

    #[tokio::test]
    async fn test_unparseable_document_contributes_nothing() {
        let fx = fixture(&[("dental.html", DENTAL_HTML), ("blank.html", "   ")]);
        let store = IndexStore::new(&fx.index);
        let built = builder(&fx, Arc::new(WordHashEmbedder::default()), None)
            .build(&store)
            .await
            .unwrap();
        assert_eq!(built.summary.files, 2);
        assert_eq!(built.summary.original_count, 8);
    }

    #[tokio::test]
    async fn test_no_entries_persists_empty_corpus_without_embedding() {
        let fx = fixture(&[("blank.html", "<html><body><div>nothing</div></body></html>")]);
        let embedder = Arc::new(WordHashEmbedder::default());
        let store = IndexStore::new(&fx.index);
        let built = builder(&fx, embedder.clone(), None).build(&store).await.unwrap();
        assert_eq!(built.summary.original_count, 0);
        assert_eq!(embedder.calls(), 0);
        assert!(store.load(Variant::Original).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_gateway_failure_aborts_without_persisting() {
        let fx = fixture(&[("dental.html", DENTAL_HTML)]);
        let store = IndexStore::new(&fx.index);
        let err = builder(&fx, Arc::new(FailingEmbedder), None)
            .build(&store)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, HmoKbError::Gateway(_)));
        assert!(!store.exists(Variant::Original));
        assert!(!store.exists(Variant::Translated));
    }

    #[tokio::test]
    async fn test_embedding_count_mismatch_is_gateway_error() {
        let fx = fixture(&[("dental.html", DENTAL_HTML)]);
        let store = IndexStore::new(&fx.index);
        let err = builder(&fx, Arc::new(FixedEmbedder(vec![vec![1.0, 0.0]])), None)
            .build(&store)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, HmoKbError::Gateway(_)));
    }
}
