use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::provider::ProviderKind;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENV_GENUI_KEY: &str = "THESYS_API_KEY";
const ENV_OPENAI_KEY: &str = "OPENAI_API_KEY";
const ENV_GENUI_MODEL: &str = "ARCHITECT_GENUI_MODEL";
const ENV_OPENAI_MODEL: &str = "ARCHITECT_OPENAI_MODEL";
const ENV_TIMEOUT: &str = "ARCHITECT_TIMEOUT_SECS";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub genui_api_key: Option<String>,
    #[serde(default)]
    pub genui_base_url: Option<String>,
    #[serde(default)]
    pub genui_model: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub openai_base_url: Option<String>,
    #[serde(default)]
    pub openai_model: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::get_config_path()?)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("Invalid config file {:?}", path))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Store an API key; a blank key removes the stored one.
    pub fn set_api_key(&mut self, provider: ProviderKind, key: &str) {
        let key = Some(key.trim().to_string()).filter(|k| !k.is_empty());
        match provider {
            ProviderKind::GenerativeUi => self.genui_api_key = key,
            ProviderKind::Chat => self.openai_api_key = key,
        }
    }

    pub fn set_model(&mut self, provider: ProviderKind, model: &str) {
        let model = Some(model.trim().to_string()).filter(|m| !m.is_empty());
        match provider {
            ProviderKind::GenerativeUi => self.genui_model = model,
            ProviderKind::Chat => self.openai_model = model,
        }
    }

    /// Overlay values from the environment; blank variables are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_GENUI_KEY) {
            self.genui_api_key = Some(key);
        }
        if let Some(key) = get(ENV_OPENAI_KEY) {
            self.openai_api_key = Some(key);
        }
        if let Some(model) = get(ENV_GENUI_MODEL) {
            self.genui_model = Some(model);
        }
        if let Some(model) = get(ENV_OPENAI_MODEL) {
            self.openai_model = Some(model);
        }
        if let Some(secs) = get(ENV_TIMEOUT).and_then(|v| v.trim().parse::<u64>().ok()) {
            self.request_timeout_secs = Some(secs);
        }
    }

    pub fn timeout_secs(&self) -> u64 {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("architect").join("config.json"))
    }
}
