use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::provider::Provider;
use crate::typewriter::DEFAULT_TYPING_SPEED;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
pub const DEFAULT_LANG: &str = "en";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub provider: String,
    pub lang: String,
    pub typing_speed_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            provider: Provider::default().as_str().to_string(),
            lang: DEFAULT_LANG.to_string(),
            typing_speed_ms: DEFAULT_TYPING_SPEED.as_millis() as u64,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, config_content)?;
        Ok(())
    }

    /// Configured provider, falling back to the default for unknown names
    pub fn provider(&self) -> Provider {
        Provider::from_str(&self.provider).unwrap_or_default()
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("jkchat").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"provider":"openrouter"}"#).unwrap();
        assert_eq!(config.provider(), Provider::OpenRouter);
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.typing_speed_ms, 12);
    }

    #[test]
    fn test_unknown_provider_falls_back() {
        let config = Config {
            provider: "nope".to_string(),
            ..Config::default()
        };
        assert_eq!(config.provider(), Provider::Gemini);
    }
}
