//! Deterministic in-process collaborators for unit tests.

use async_trait::async_trait;
use hmokb_core::error::{HmoKbError, Result};
use hmokb_core::traits::{Embedder, Translator};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const DIM: usize = 256;

/// Bag-of-words embedder: each lower-cased token is hashed into one of
/// `DIM` buckets, so texts sharing words score closer.
#[derive(Default)]
pub struct WordHashEmbedder {
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl WordHashEmbedder {
    pub fn slow(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Some(delay),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0f32; DIM];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = token
                .to_lowercase()
                .bytes()
                .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
            v[bucket as usize % DIM] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for WordHashEmbedder {
    fn name(&self) -> &str {
        "word-hash"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

/// Returns whatever vectors it was constructed with, ignoring the input.
pub struct FixedEmbedder(pub Vec<Vec<f32>>);

#[async_trait]
impl Embedder for FixedEmbedder {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(self.0.clone())
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(HmoKbError::Gateway("connection refused".into()))
    }
}

/// "Translates" by upper-casing; counts calls.
#[derive(Default)]
pub struct UppercaseTranslator {
    calls: AtomicUsize,
}

impl UppercaseTranslator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for UppercaseTranslator {
    fn name(&self) -> &str {
        "uppercase"
    }

    async fn translate(&self, text: &str, _target_lang: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(text.to_uppercase())
    }
}

pub struct FailingTranslator;

#[async_trait]
impl Translator for FailingTranslator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn translate(&self, _text: &str, _target_lang: &str) -> Result<String> {
        Err(HmoKbError::Translation("rate limited".into()))
    }
}

/// Benefits page with one paragraph and a 3×3 organization/tier table.
pub const DENTAL_HTML: &str = r#"<html><body>
<h2>Dental</h2>
<p>Dental care for members of all health funds.</p>
<table>
  <tr><th>Service</th><th>מכבי</th><th>מאוחדת</th><th>כללית</th></tr>
  <tr><td>Checkup</td>
      <td><strong>זהב:</strong> Free checkup <strong>כסף:</strong> 20% discount</td>
      <td><strong>זהב:</strong> 10% discount</td>
      <td><strong>זהב:</strong> 15% discount</td></tr>
  <tr><td>Fillings</td>
      <td><strong>זהב:</strong> 50% discount on fillings</td>
      <td><strong>ארד:</strong> 5% discount on fillings</td>
      <td>Not covered</td></tr>
</table>
</body></html>"#;
