//! # HMO-KB Knowledge
//!
//! Indexing and retrieval for the benefits knowledge base.
//!
//! - `parser` — structural HTML parser (headings, paragraphs, lists, tables)
//! - `canon` — organization / tier canonicalization and strict filters
//! - `builder` — documents → entries → embeddings, both language variants
//! - `cache` — content-addressed translation cache
//! - `store` — `.npy` + `meta.json` persistence with atomic publish
//! - `search` — cosine ranking, broad and filtered search
//! - `engine` — `KnowledgeBase`, the build/query facade

pub mod builder;
pub mod cache;
pub mod canon;
pub mod engine;
pub mod npy;
pub mod parser;
pub mod search;
pub mod store;

#[cfg(test)]
mod test_support;

pub use builder::{BuildSummary, IndexBuilder, embeddable_text};
pub use cache::{FileTranslationCache, TranslationCache};
pub use canon::{AttributeFilter, AttributeKind, Organization, Tier, canonicalize};
pub use engine::KnowledgeBase;
pub use parser::StructuralParser;
pub use search::DualResults;
pub use store::{IndexCorpus, IndexStore, VariantStatus};
