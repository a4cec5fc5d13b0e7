//! File-based index store.
//!
//! Each variant lives in its own directory under the index root:
//! `vectors.npy` holds the `(N, D)` embedding matrix and `meta.json` the
//! N entries in the same order. A generation is written to a staging
//! directory and swapped in with a directory rename, so readers see either
//! the previous generation or the new one.

use crate::npy;
use hmokb_core::error::{HmoKbError, Result};
use hmokb_core::types::{Entry, Variant};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const META_FILE: &str = "meta.json";
const VECTORS_FILE: &str = "vectors.npy";

/// Entries and their embeddings for one variant. Row `i` of `vectors`
/// belongs to `entries[i]`.
#[derive(Debug, Clone)]
pub struct IndexCorpus {
    entries: Vec<Entry>,
    vectors: Vec<Vec<f32>>,
    dim: usize,
}

impl IndexCorpus {
    pub fn new(entries: Vec<Entry>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if entries.len() != vectors.len() {
            return Err(HmoKbError::Store(format!(
                "{} entries but {} vectors",
                entries.len(),
                vectors.len()
            )));
        }
        let dim = vectors.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = vectors.iter().position(|v| v.len() != dim) {
            return Err(HmoKbError::Store(format!(
                "vector {bad} has dimension {}, expected {dim}",
                vectors[bad].len()
            )));
        }
        Ok(Self {
            entries,
            vectors,
            dim,
        })
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build state of one variant, as reported by `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantStatus {
    pub variant: Variant,
    pub built: bool,
    pub entries: usize,
}

#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn variant_dir(&self, variant: Variant) -> PathBuf {
        self.root.join(variant.as_str())
    }

    fn staging_dir(&self, variant: Variant) -> PathBuf {
        self.root.join(format!(".{}.staging", variant.as_str()))
    }

    fn parked_dir(&self, variant: Variant) -> PathBuf {
        self.root.join(format!(".{}.previous", variant.as_str()))
    }

    /// Persist a new generation for `variant`, replacing the current one.
    pub fn save(&self, variant: Variant, entries: &[Entry], vectors: &[Vec<f32>]) -> Result<()> {
        if entries.len() != vectors.len() {
            return Err(HmoKbError::Store(format!(
                "{} entries but {} vectors",
                entries.len(),
                vectors.len()
            )));
        }
        let dim = vectors.first().map(Vec::len).unwrap_or(0);

        std::fs::create_dir_all(&self.root)?;
        self.recover(variant)?;
        let staging = self.staging_dir(variant);
        if staging.exists() {
            std::fs::remove_dir_all(&staging)?;
        }
        std::fs::create_dir_all(&staging)?;

        let mut meta = BufWriter::new(File::create(staging.join(META_FILE))?);
        serde_json::to_writer_pretty(&mut meta, entries)?;
        meta.flush()?;
        meta.get_ref().sync_all()?;

        let mut npy_out = BufWriter::new(File::create(staging.join(VECTORS_FILE))?);
        npy::write_matrix(&mut npy_out, vectors, dim)?;
        npy_out.flush()?;
        npy_out.get_ref().sync_all()?;

        let live = self.variant_dir(variant);
        let parked = self.parked_dir(variant);
        if parked.exists() {
            std::fs::remove_dir_all(&parked)?;
        }
        if live.exists() {
            std::fs::rename(&live, &parked)?;
        }
        std::fs::rename(&staging, &live)?;
        if parked.exists() {
            if let Err(e) = std::fs::remove_dir_all(&parked) {
                tracing::warn!("⚠️ Could not remove previous {variant} index: {e}");
            }
        }

        tracing::debug!(
            "💾 Saved {} {variant} entries (dim {dim}) to {}",
            entries.len(),
            live.display()
        );
        Ok(())
    }

    /// Load the current generation of `variant`.
    ///
    /// Never modifies the store. While a save is between its two renames
    /// only the parked generation exists, and it is read in place. A
    /// generation that moves away mid-read is retried once from wherever
    /// the store points now.
    pub fn load(&self, variant: Variant) -> Result<IndexCorpus> {
        let dir = self.current_dir(variant)?;
        match self.load_dir(variant, &dir) {
            Err(HmoKbError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("{variant} index moved while loading, retrying");
                let dir = self.current_dir(variant)?;
                self.load_dir(variant, &dir)
            }
            other => other,
        }
    }

    fn current_dir(&self, variant: Variant) -> Result<PathBuf> {
        let live = self.variant_dir(variant);
        if live.join(META_FILE).exists() {
            return Ok(live);
        }
        let parked = self.parked_dir(variant);
        if parked.join(META_FILE).exists() {
            return Ok(parked);
        }
        Err(HmoKbError::NotFound(variant))
    }

    fn load_dir(&self, variant: Variant, dir: &Path) -> Result<IndexCorpus> {
        let meta = BufReader::new(File::open(dir.join(META_FILE))?);
        let entries: Vec<Entry> = serde_json::from_reader(meta)?;

        let mut npy_in = BufReader::new(File::open(dir.join(VECTORS_FILE))?);
        let (vectors, dim) = npy::read_matrix(&mut npy_in)?;

        if vectors.len() != entries.len() {
            return Err(HmoKbError::Store(format!(
                "{variant} index is inconsistent: {} metadata rows, {} vectors",
                entries.len(),
                vectors.len()
            )));
        }

        tracing::debug!("📂 Loaded {} {variant} entries (dim {dim})", entries.len());
        Ok(IndexCorpus {
            entries,
            vectors,
            dim,
        })
    }

    /// A crash between parking the old generation and renaming the new one
    /// leaves only the parked directory; put it back. Writers only.
    fn recover(&self, variant: Variant) -> Result<()> {
        let live = self.variant_dir(variant);
        let parked = self.parked_dir(variant);
        if !live.exists() && parked.exists() {
            tracing::warn!("⚠️ Recovering parked {variant} index from an interrupted build");
            std::fs::rename(&parked, &live)?;
        }
        Ok(())
    }

    pub fn exists(&self, variant: Variant) -> bool {
        let dir = self.variant_dir(variant);
        dir.join(META_FILE).exists() || self.parked_dir(variant).join(META_FILE).exists()
    }

    /// Which variants are built, with their entry counts.
    pub fn status(&self) -> Vec<VariantStatus> {
        Variant::ALL
            .iter()
            .map(|&variant| {
                let entries = self.count_entries(variant);
                VariantStatus {
                    variant,
                    built: entries.is_some(),
                    entries: entries.unwrap_or(0),
                }
            })
            .collect()
    }

    fn count_entries(&self, variant: Variant) -> Option<usize> {
        let dir = self.current_dir(variant).ok()?;
        let file = File::open(dir.join(META_FILE)).ok()?;
        match serde_json::from_reader::<_, Vec<serde_json::Value>>(BufReader::new(file)) {
            Ok(rows) => Some(rows.len()),
            Err(e) => {
                tracing::warn!("⚠️ Unreadable {variant} metadata: {e}");
                None
            }
        }
    }
}
