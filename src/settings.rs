use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::catalog::Catalog;

pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SettingsOverrides {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// Contents of the optional JSON config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StudioConfig {
    pub client: Option<SettingsOverrides>,
    pub catalog: Option<Catalog>,
}

impl StudioConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {}", path.display(), e))?;
        let cfg: StudioConfig = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("failed to parse config {}: {}", path.display(), e))?;
        if let Some(catalog) = &cfg.catalog {
            catalog.validate()?;
        }
        Ok(cfg)
    }

    pub fn catalog_or_default(&self) -> Catalog {
        self.catalog.clone().unwrap_or_default()
    }
}

/// Fixed per process: nothing here varies between calls.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            model: DEFAULT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ClientSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub fn resolve_client_settings(
    file: &SettingsOverrides,
    cli: &SettingsOverrides,
) -> anyhow::Result<ClientSettings> {
    let defaults = ClientSettings::default();

    let endpoint = cli
        .endpoint
        .clone()
        .or_else(|| file.endpoint.clone())
        .unwrap_or(defaults.endpoint);
    let parsed = url::Url::parse(&endpoint)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("unsupported endpoint scheme: {}", parsed.scheme());
    }

    let timeout_secs = cli.timeout_secs.or(file.timeout_secs).unwrap_or(defaults.timeout_secs);
    if timeout_secs == 0 {
        anyhow::bail!("timeout_secs must be positive");
    }

    Ok(ClientSettings {
        endpoint,
        model: cli.model.clone().or_else(|| file.model.clone()).unwrap_or(defaults.model),
        temperature: cli.temperature.or(file.temperature).unwrap_or(defaults.temperature),
        max_tokens: cli.max_tokens.or(file.max_tokens).unwrap_or(defaults.max_tokens),
        timeout_secs,
    })
}

/// Read once at startup. Absence is left for the provider to reject.
pub fn api_key_from_env() -> Option<String> {
    let key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty());
    if key.is_none() {
        tracing::warn!("{} is not set; generation requests will be sent unauthenticated", API_KEY_ENV);
    }
    key
}
