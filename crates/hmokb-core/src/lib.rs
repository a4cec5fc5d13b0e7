//! # HMO-KB Core
//!
//! Shared building blocks for the benefits knowledge base:
//! configuration, the error taxonomy, the `Entry` data model and the
//! collaborator traits (`Embedder`, `Translator`) the index builder and
//! retriever are written against.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::HmoKbConfig;
pub use error::{HmoKbError, Result};
pub use traits::{Embedder, Translator};
pub use types::{CellContext, Entry, EntryContext, EntryKind, Hit, Variant};
