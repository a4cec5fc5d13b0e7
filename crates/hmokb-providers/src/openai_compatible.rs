//! Unified OpenAI-compatible client.
//!
//! One HTTP client type serves both collaborators the index builder needs:
//! batch embeddings (`/embeddings`) and document translation
//! (`/chat/completions`). Providers are distinguished only by endpoint URL,
//! URL layout, auth style and API key.

use async_trait::async_trait;
use hmokb_core::error::{HmoKbError, Result};
use hmokb_core::traits::{Embedder, Translator};
use serde_json::{Value, json};
use std::time::Duration;

use crate::provider_registry::{AuthStyle, ProviderConfig, UrlStyle};

/// HTTP plumbing shared by the embedder and the translator.
pub struct OpenAiCompatibleClient {
    /// Provider name (e.g., "openai", "azure", "ollama").
    name: String,
    api_key: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    base_url: String,
    embeddings_path: String,
    chat_path: String,
    auth_style: AuthStyle,
    url_style: UrlStyle,
    /// Azure `api-version` query parameter.
    api_version: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleClient {
    /// Create from a known provider config.
    ///
    /// Resolution order:
    /// - API key: `api_key` argument > env vars > empty
    /// - Base URL: `endpoint` argument > env override > registry default
    pub fn from_registry(
        registry: &ProviderConfig,
        endpoint: &str,
        api_key: &str,
        api_version: &str,
        timeout_secs: u64,
    ) -> Result<Self> {
        let api_key = if !api_key.is_empty() {
            api_key.to_string()
        } else {
            registry
                .env_keys
                .iter()
                .find_map(|key| std::env::var(key).ok())
                .unwrap_or_default()
        };

        let base_url = if !endpoint.is_empty() {
            endpoint.trim_end_matches('/').to_string()
        } else {
            registry
                .base_url_env
                .and_then(|env_key| {
                    let val = std::env::var(env_key).ok()?;
                    let val = val.trim_end_matches('/');
                    // For OLLAMA_HOST / LLAMACPP_HOST, append /v1 if not present
                    if registry.url_style == UrlStyle::AzureDeployment || val.ends_with("/v1") {
                        Some(val.to_string())
                    } else {
                        Some(format!("{val}/v1"))
                    }
                })
                .unwrap_or_else(|| registry.base_url.to_string())
        };

        if base_url.is_empty() {
            return Err(HmoKbError::Config(format!(
                "Provider '{}' requires an endpoint",
                registry.name
            )));
        }

        Ok(Self {
            name: registry.name.to_string(),
            api_key,
            base_url,
            embeddings_path: registry.embeddings_path.to_string(),
            chat_path: registry.chat_path.to_string(),
            auth_style: registry.auth_style,
            url_style: registry.url_style,
            api_version: api_version.to_string(),
            client: build_http_client(timeout_secs)?,
        })
    }

    /// Create for a custom endpoint (e.g., "custom:https://my-server.com/v1").
    pub fn custom(endpoint: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let base_url = endpoint
            .strip_prefix("custom:")
            .unwrap_or(endpoint)
            .trim_end_matches('/')
            .to_string();

        let api_key = if !api_key.is_empty() {
            api_key.to_string()
        } else {
            std::env::var("CUSTOM_API_KEY").unwrap_or_default()
        };

        let auth_style = if api_key.is_empty() {
            AuthStyle::None
        } else {
            AuthStyle::Bearer
        };

        Ok(Self {
            name: "custom".to_string(),
            api_key,
            base_url,
            embeddings_path: "/embeddings".to_string(),
            chat_path: "/chat/completions".to_string(),
            auth_style,
            url_style: UrlStyle::Standard,
            api_version: String::new(),
            client: build_http_client(timeout_secs)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full request URL for `path`; Azure routes by deployment (= model).
    fn url(&self, model: &str, path: &str) -> String {
        match self.url_style {
            UrlStyle::Standard => format!("{}{}", self.base_url, path),
            UrlStyle::AzureDeployment => format!(
                "{}/openai/deployments/{}{}?api-version={}",
                self.base_url, model, path, self.api_version
            ),
        }
    }

    /// Build the auth header for the request.
    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_style {
            AuthStyle::Bearer if !self.api_key.is_empty() => {
                req.header("Authorization", format!("Bearer {}", self.api_key))
            }
            AuthStyle::ApiKeyHeader if !self.api_key.is_empty() => {
                req.header("api-key", self.api_key.as_str())
            }
            _ => req,
        }
    }

    fn ensure_credentials(&self) -> Result<()> {
        if self.auth_style != AuthStyle::None && self.api_key.is_empty() {
            return Err(HmoKbError::ApiKeyMissing(self.name.clone()));
        }
        Ok(())
    }

    /// POST a JSON body and return the decoded JSON response.
    /// Errors are plain messages; callers wrap them in their own error kind.
    async fn post_json(
        &self,
        model: &str,
        path: &str,
        body: &Value,
    ) -> std::result::Result<Value, String> {
        let url = self.url(model, path);
        let req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body);
        let req = self.apply_auth(req);

        let resp = req
            .send()
            .await
            .map_err(|e| format!("{} connection failed ({}): {}", self.name, url, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(format!("{} API error {}: {}", self.name, status, text));
        }

        resp.json()
            .await
            .map_err(|e| format!("{} returned invalid JSON: {}", self.name, e))
    }
}

fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| HmoKbError::Config(format!("Failed to build HTTP client: {e}")))
}

/// Embedding gateway over an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    client: OpenAiCompatibleClient,
    model: String,
    batch_size: usize,
    dimensions: usize,
}

impl OpenAiEmbedder {
    pub fn new(
        client: OpenAiCompatibleClient,
        model: &str,
        batch_size: usize,
        dimensions: usize,
    ) -> Self {
        Self {
            client,
            model: model.to_string(),
            batch_size: batch_size.max(1),
            dimensions,
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &str {
        self.client.name()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.client
            .ensure_credentials()
            .map_err(|e| HmoKbError::Gateway(e.to_string()))?;

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let body = json!({
                "model": self.model,
                "input": batch,
            });
            let json = self
                .client
                .post_json(&self.model, &self.client.embeddings_path, &body)
                .await
                .map_err(HmoKbError::Gateway)?;
            vectors.extend(parse_embeddings(&json, batch.len())?);
        }

        if self.dimensions > 0 {
            if let Some(v) = vectors.iter().find(|v| v.len() != self.dimensions) {
                return Err(HmoKbError::Gateway(format!(
                    "{} returned {}-dimensional vectors, expected {}",
                    self.model,
                    v.len(),
                    self.dimensions
                )));
            }
        }

        tracing::debug!(
            "🧮 {} embedded {} texts with {}",
            self.client.name(),
            vectors.len(),
            self.model
        );
        Ok(vectors)
    }
}

/// Decode an OpenAI `/embeddings` response, restoring input order.
pub fn parse_embeddings(json: &Value, expected: usize) -> Result<Vec<Vec<f32>>> {
    let data = json["data"]
        .as_array()
        .ok_or_else(|| HmoKbError::Gateway("No data in embeddings response".into()))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(pos);
        let values = item["embedding"]
            .as_array()
            .ok_or_else(|| HmoKbError::Gateway(format!("Embedding {index} is not an array")))?;
        let vector = values
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Option<Vec<f32>>>()
            .ok_or_else(|| HmoKbError::Gateway(format!("Embedding {index} has non-numeric values")))?;
        indexed.push((index, vector));
    }

    if indexed.len() != expected {
        return Err(HmoKbError::Gateway(format!(
            "Expected {expected} embeddings, got {}",
            indexed.len()
        )));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

/// Translator backed by a chat-completion model.
pub struct OpenAiTranslator {
    client: OpenAiCompatibleClient,
    model: String,
    temperature: f32,
}

impl OpenAiTranslator {
    pub fn new(client: OpenAiCompatibleClient, model: &str, temperature: f32) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature,
        }
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    fn name(&self) -> &str {
        self.client.name()
    }

    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        self.client
            .ensure_credentials()
            .map_err(|e| HmoKbError::Translation(e.to_string()))?;

        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                {"role": "system", "content": "You are a helpful translator."},
                {"role": "user", "content": format!(
                    "Translate the following html to {target_lang}. Keep every tag and \
                     attribute unchanged, translate only the visible text, and reply \
                     with the html only:\n{text}"
                )},
            ],
        });

        let json = self
            .client
            .post_json(&self.model, &self.client.chat_path, &body)
            .await
            .map_err(HmoKbError::Translation)?;

        let content = json["choices"]
            .get(0)
            .and_then(|choice| choice["message"]["content"].as_str())
            .ok_or_else(|| HmoKbError::Translation("No choices in response".into()))?;

        let translated = strip_code_fences(content);
        if translated.trim().is_empty() {
            return Err(HmoKbError::Translation("Empty translation".into()));
        }
        Ok(translated)
    }
}

/// Chat models like to wrap html in markdown fences; drop them.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Skip the info string ("html") on the opening fence line.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider_registry::get_provider_config;

    #[test]
    fn test_parse_embeddings_restores_order() {
        let json = json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]},
            ]
        });
        let vectors = parse_embeddings(&json, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_embeddings_count_mismatch_is_gateway_error() {
        let json = json!({"data": [{"index": 0, "embedding": [1.0]}]});
        let err = parse_embeddings(&json, 2).unwrap_err();
        assert!(matches!(err, HmoKbError::Gateway(_)));

        let err = parse_embeddings(&json!({"error": "boom"}), 1).unwrap_err();
        assert!(matches!(err, HmoKbError::Gateway(_)));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```html\n<p>Hi</p>\n```"), "<p>Hi</p>");
        assert_eq!(strip_code_fences("  <p>Hi</p> "), "<p>Hi</p>");
        assert_eq!(strip_code_fences("```\n<p>Hi</p>"), "<p>Hi</p>");
    }

    #[test]
    fn test_azure_url_layout() {
        let registry = get_provider_config("azure").unwrap();
        let client = OpenAiCompatibleClient::from_registry(
            registry,
            "https://kb.openai.azure.com/",
            "secret",
            "2024-08-01-preview",
            30,
        )
        .unwrap();
        assert_eq!(
            client.url("text-embedding-ada-002", "/embeddings"),
            "https://kb.openai.azure.com/openai/deployments/text-embedding-ada-002/embeddings?api-version=2024-08-01-preview"
        );
    }

    #[test]
    fn test_standard_url_layout() {
        let registry = get_provider_config("openai").unwrap();
        let client =
            OpenAiCompatibleClient::from_registry(registry, "http://localhost:9000/v1", "k", "", 30)
                .unwrap();
        assert_eq!(client.url("m", "/embeddings"), "http://localhost:9000/v1/embeddings");
    }

    #[test]
    fn test_custom_without_key_needs_no_auth() {
        let client = OpenAiCompatibleClient::custom("custom:http://127.0.0.1:1/v1/", "", 5).unwrap();
        assert_eq!(client.base_url, "http://127.0.0.1:1/v1");
        if std::env::var("CUSTOM_API_KEY").is_err() {
            assert!(client.ensure_credentials().is_ok());
        }
    }

    #[tokio::test]
    async fn test_embed_empty_input_skips_request() {
        let client = OpenAiCompatibleClient::custom("custom:http://127.0.0.1:1/v1", "", 1).unwrap();
        let embedder = OpenAiEmbedder::new(client, "m", 8, 0);
        assert!(embedder.embed(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_surfaces_as_gateway_error() {
        if std::env::var("TOGETHER_API_KEY").is_ok() {
            return;
        }
        let registry = get_provider_config("together").unwrap();
        let client =
            OpenAiCompatibleClient::from_registry(registry, "http://127.0.0.1:1/v1", "", "", 1)
                .unwrap();
        assert!(matches!(
            client.ensure_credentials(),
            Err(HmoKbError::ApiKeyMissing(_))
        ));

        let embedder = OpenAiEmbedder::new(client, "m", 8, 0);
        let err = embedder.embed(&["hello".to_string()]).await.unwrap_err();
        assert!(matches!(err, HmoKbError::Gateway(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_gateway_error() {
        let client = OpenAiCompatibleClient::custom("custom:http://127.0.0.1:1/v1", "k", 2).unwrap();
        let embedder = OpenAiEmbedder::new(client, "m", 8, 0);
        let err = embedder.embed(&["hello".to_string()]).await.unwrap_err();
        assert!(matches!(err, HmoKbError::Gateway(_)));
    }
}
