//! HMO-KB configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HmoKbError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HmoKbConfig {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl HmoKbConfig {
    /// Load config from the default path (~/.hmokb/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HmoKbError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| HmoKbError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| HmoKbError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the HMO-KB home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".hmokb")
    }
}

/// Where documents come from and where derived artifacts go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Root scanned recursively for `*.html` documents.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Root of `original/`, `translated/` and `translated_cache/`.
    #[serde(default = "default_index_dir")]
    pub index_dir: String,
    /// Language the translated corpus is produced in.
    #[serde(default = "default_target_language")]
    pub target_language: String,
}

fn default_data_dir() -> String { "~/.hmokb/documents".into() }
fn default_index_dir() -> String { "~/.hmokb/index".into() }
fn default_target_language() -> String { "en".into() }

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            index_dir: default_index_dir(),
            target_language: default_target_language(),
        }
    }
}

impl IndexConfig {
    pub fn document_root(&self) -> PathBuf {
        expand_path(&self.data_dir)
    }

    pub fn index_root(&self) -> PathBuf {
        expand_path(&self.index_dir)
    }
}

/// Embedding gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    /// Overrides the registry base URL (required for Azure).
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Expected vector length; 0 accepts whatever the model returns.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    /// Inputs per HTTP request; one logical batch may span several requests.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_provider() -> String { "openai".into() }
fn default_embedding_model() -> String { "text-embedding-ada-002".into() }
fn default_api_version() -> String { "2024-08-01-preview".into() }
fn default_dimensions() -> usize { 1536 }
fn default_batch_size() -> usize { 256 }
fn default_timeout_secs() -> u64 { 60 }

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            api_key: String::new(),
            endpoint: String::new(),
            api_version: default_api_version(),
            dimensions: default_dimensions(),
            batch_size: default_batch_size(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

/// Translator configuration (chat-completion based).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// When disabled the translated corpus is built from source text.
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_translation_temperature")]
    pub temperature: f32,
    #[serde(default = "default_translation_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn bool_true() -> bool { true }
fn default_chat_model() -> String { "gpt-4o".into() }
fn default_translation_temperature() -> f32 { 0.3 }
fn default_translation_timeout_secs() -> u64 { 300 }

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: default_provider(),
            model: default_chat_model(),
            api_key: String::new(),
            endpoint: String::new(),
            api_version: default_api_version(),
            temperature: default_translation_temperature(),
            request_timeout_secs: default_translation_timeout_secs(),
        }
    }
}

/// Search defaults used when the caller does not pass explicit values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_k_broad")]
    pub k_broad: usize,
    #[serde(default = "default_k_filtered")]
    pub k_filtered: usize,
    #[serde(default = "default_language")]
    pub default_language: String,
}

fn default_k_broad() -> usize { 6 }
fn default_k_filtered() -> usize { 3 }
fn default_language() -> String { "he".into() }

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            k_broad: default_k_broad(),
            k_filtered: default_k_filtered(),
            default_language: default_language(),
        }
    }
}

/// Expand `~` and environment variables in a configured path.
pub fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HmoKbConfig::default();
        assert_eq!(config.embedding.provider, "openai");
        assert_eq!(config.embedding.dimensions, 1536);
        assert_eq!(config.index.target_language, "en");
        assert_eq!(config.search.k_broad, 6);
        assert_eq!(config.search.k_filtered, 3);
        assert!(config.translation.enabled);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [index]
            data_dir = "/srv/kb/docs"
            index_dir = "/srv/kb/index"

            [embedding]
            provider = "azure"
            model = "text-embedding-3-small"
            endpoint = "https://example.openai.azure.com"
            dimensions = 1536

            [translation]
            enabled = false
        "#;

        let config: HmoKbConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.embedding.provider, "azure");
        assert_eq!(config.index.document_root(), PathBuf::from("/srv/kb/docs"));
        assert!(!config.translation.enabled);
        assert_eq!(config.translation.model, "gpt-4o");
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: HmoKbConfig = toml::from_str("").unwrap();
        assert_eq!(config.embedding.batch_size, 256);
        assert_eq!(config.search.default_language, "he");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile_dir();
        let path = dir.join("nested").join("config.toml");
        let mut config = HmoKbConfig::default();
        config.search.k_broad = 10;
        config.save_to(&path).unwrap();
        let back = HmoKbConfig::load_from(&path).unwrap();
        assert_eq!(back.search.k_broad, 10);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_home_dir() {
        let home = HmoKbConfig::home_dir();
        assert!(home.to_string_lossy().contains("hmokb"));
    }

    fn tempfile_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hmokb-test-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).ok();
        dir
    }
}
