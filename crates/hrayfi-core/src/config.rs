use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ai::openrouter::{DEFAULT_ENDPOINT, DEFAULT_MODEL};

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the config file, falling back to defaults when it is missing or
    /// unreadable. The environment key applies either way.
    pub fn load() -> Self {
        let file = Self::get_config_path().and_then(|path| Self::load_from(&path));
        Self::resolve(file, std::env::var(API_KEY_ENV).ok())
    }

    fn resolve(file: Result<Self>, env_key: Option<String>) -> Self {
        let config = file.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "could not read config, using defaults");
            Self::new()
        });
        config.with_env_key(env_key)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// A non-empty environment key wins over the stored one.
    pub fn with_env_key(mut self, env_key: Option<String>) -> Self {
        if let Some(key) = env_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        self
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("hrayfi").join("config.json"))
    }
}
