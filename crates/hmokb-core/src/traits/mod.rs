//! Collaborator traits. Implementations live in `hmokb-providers`;
//! the knowledge crate only sees these seams.

pub mod embedder;
pub mod translator;

pub use embedder::Embedder;
pub use translator::Translator;
