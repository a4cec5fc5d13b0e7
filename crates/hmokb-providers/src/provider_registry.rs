//! Provider registry — maps provider names to endpoint configurations.
//!
//! Every supported backend speaks the OpenAI wire format for
//! `/embeddings` and `/chat/completions`; they differ only by base URL,
//! URL layout and how credentials are attached.

/// How to attach auth credentials to requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `api-key: <key>` (Azure OpenAI).
    ApiKeyHeader,
    /// No authentication required (local servers).
    None,
}

/// How request URLs are assembled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UrlStyle {
    /// `{base}{path}` with the model in the body.
    Standard,
    /// `{base}/openai/deployments/{model}{path}?api-version={version}`.
    AzureDeployment,
}

/// Configuration for a single provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider identifier.
    pub name: &'static str,
    /// Base URL for the API. Empty when the endpoint must be configured.
    pub base_url: &'static str,
    /// Path for the embeddings endpoint (appended to base_url).
    pub embeddings_path: &'static str,
    /// Path for chat completions endpoint (appended to base_url).
    pub chat_path: &'static str,
    /// Environment variable names to try for the API key (in order).
    pub env_keys: &'static [&'static str],
    /// How to send auth credentials.
    pub auth_style: AuthStyle,
    pub url_style: UrlStyle,
    /// Environment variable to override the base URL (e.g., OLLAMA_HOST).
    pub base_url_env: Option<&'static str>,
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// All known providers.
static PROVIDERS: &[ProviderConfig] = &[
    ProviderConfig {
        name: "openai",
        base_url: "https://api.openai.com/v1",
        embeddings_path: "/embeddings",
        chat_path: "/chat/completions",
        env_keys: &["OPENAI_API_KEY"],
        auth_style: AuthStyle::Bearer,
        url_style: UrlStyle::Standard,
        base_url_env: Some("OPENAI_API_BASE"),
    },
    ProviderConfig {
        name: "azure",
        base_url: "",
        embeddings_path: "/embeddings",
        chat_path: "/chat/completions",
        env_keys: &["AZURE_OPENAI_API_KEY"],
        auth_style: AuthStyle::ApiKeyHeader,
        url_style: UrlStyle::AzureDeployment,
        base_url_env: Some("AZURE_OPENAI_ENDPOINT"),
    },
    ProviderConfig {
        name: "ollama",
        base_url: "http://localhost:11434/v1",
        embeddings_path: "/embeddings",
        chat_path: "/chat/completions",
        env_keys: &[],
        auth_style: AuthStyle::None,
        url_style: UrlStyle::Standard,
        base_url_env: Some("OLLAMA_HOST"),
    },
    ProviderConfig {
        name: "llamacpp",
        base_url: "http://localhost:8080/v1",
        embeddings_path: "/embeddings",
        chat_path: "/chat/completions",
        env_keys: &[],
        auth_style: AuthStyle::None,
        url_style: UrlStyle::Standard,
        base_url_env: Some("LLAMACPP_HOST"),
    },
    ProviderConfig {
        name: "together",
        base_url: "https://api.together.xyz/v1",
        embeddings_path: "/embeddings",
        chat_path: "/chat/completions",
        env_keys: &["TOGETHER_API_KEY"],
        auth_style: AuthStyle::Bearer,
        url_style: UrlStyle::Standard,
        base_url_env: None,
    },
    ProviderConfig {
        name: "mistral",
        base_url: "https://api.mistral.ai/v1",
        embeddings_path: "/embeddings",
        chat_path: "/chat/completions",
        env_keys: &["MISTRAL_API_KEY"],
        auth_style: AuthStyle::Bearer,
        url_style: UrlStyle::Standard,
        base_url_env: None,
    },
];

/// Look up a provider config by name.
pub fn get_provider_config(name: &str) -> Option<&'static ProviderConfig> {
    // Also match aliases
    let lookup = match name {
        "azure_openai" | "azure-openai" | "aoai" => "azure",
        "llama.cpp" => "llamacpp",
        "together_ai" | "togetherai" => "together",
        other => other,
    };
    PROVIDERS.iter().find(|p| p.name == lookup)
}

/// List all known provider names.
pub fn all_provider_names() -> Vec<&'static str> {
    PROVIDERS.iter().map(|p| p.name).collect()
}
