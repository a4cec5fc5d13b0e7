//! # HMO-KB Providers
//!
//! Embedding and translation backends for the index builder and retriever.
//! All supported backends (OpenAI, Azure OpenAI, Ollama, llama.cpp,
//! Together, Mistral, custom endpoints) share `OpenAiCompatibleClient`.

pub mod openai_compatible;
pub mod provider_registry;

use hmokb_core::config::{EmbeddingConfig, TranslationConfig};
use hmokb_core::error::{HmoKbError, Result};
use hmokb_core::traits::{Embedder, Translator};

use openai_compatible::{OpenAiCompatibleClient, OpenAiEmbedder, OpenAiTranslator};

fn create_client(
    provider_name: &str,
    endpoint: &str,
    api_key: &str,
    api_version: &str,
    timeout_secs: u64,
) -> Result<OpenAiCompatibleClient> {
    match provider_name {
        // Custom endpoint: "custom:https://my-server.com/v1"
        other if other.starts_with("custom:") => {
            OpenAiCompatibleClient::custom(other, api_key, timeout_secs)
        }
        _ => {
            let registry = provider_registry::get_provider_config(provider_name).ok_or_else(|| {
                HmoKbError::Config(format!("Unknown provider: '{provider_name}'"))
            })?;
            OpenAiCompatibleClient::from_registry(
                registry,
                endpoint,
                api_key,
                api_version,
                timeout_secs,
            )
        }
    }
}

/// Create the embedding gateway from configuration.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let client = create_client(
        &config.provider,
        &config.endpoint,
        &config.api_key,
        &config.api_version,
        config.request_timeout_secs,
    )?;
    Ok(Box::new(OpenAiEmbedder::new(
        client,
        &config.model,
        config.batch_size,
        config.dimensions,
    )))
}

/// Create the translator, or `None` when translation is disabled.
pub fn create_translator(config: &TranslationConfig) -> Result<Option<Box<dyn Translator>>> {
    if !config.enabled {
        return Ok(None);
    }
    let client = create_client(
        &config.provider,
        &config.endpoint,
        &config.api_key,
        &config.api_version,
        config.request_timeout_secs,
    )?;
    Ok(Some(Box::new(OpenAiTranslator::new(
        client,
        &config.model,
        config.temperature,
    ))))
}

/// List all available provider names.
pub fn available_providers() -> Vec<&'static str> {
    let mut names = provider_registry::all_provider_names();
    names.push("custom");
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_is_config_error() {
        let config = EmbeddingConfig {
            provider: "does-not-exist".into(),
            ..EmbeddingConfig::default()
        };
        assert!(matches!(create_embedder(&config), Err(HmoKbError::Config(_))));
    }

    #[test]
    fn test_disabled_translation_yields_none() {
        let config = TranslationConfig {
            enabled: false,
            ..TranslationConfig::default()
        };
        assert!(create_translator(&config).unwrap().is_none());
    }

    #[test]
    fn test_custom_embedder() {
        let config = EmbeddingConfig {
            provider: "custom:http://localhost:9999/v1".into(),
            ..EmbeddingConfig::default()
        };
        let embedder = create_embedder(&config).unwrap();
        assert_eq!(embedder.name(), "custom");
    }

    #[test]
    fn test_available_providers() {
        let names = available_providers();
        assert!(names.contains(&"azure"));
        assert!(names.contains(&"custom"));
    }
}
