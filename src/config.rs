use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;
use url::Url;

/// Environment variables that override `telegram.bot_token`, in priority order.
const TOKEN_ENV_VARS: [&str; 2] = ["TELEGRAM_BOT_TOKEN", "TELEGRAM_API_TOKEN"];

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub content: ContentConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    #[serde(default = "default_fact_url")]
    pub fact_url: String,
    #[serde(default = "default_joke_url")]
    pub joke_url: String,
}

/// Validated URLs of every API the bot talks to.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub fact: Url,
    pub joke: Url,
    pub send_message: Url,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_fact_url() -> String {
    "https://uselessfacts.jsph.pl/today.json?language=en".to_string()
}

fn default_joke_url() -> String {
    "http://api.icndb.com/jokes/random?limitTo=[nerdy]".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base_url: default_api_base_url(),
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            fact_url: default_fact_url(),
            joke_url: default_joke_url(),
        }
    }
}

impl Config {
    /// Load the config file if it exists, then apply environment overrides.
    /// Every setting has a default, so a missing file is not an error.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            info!(
                "No config file at {}, using defaults and environment",
                path.display()
            );
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML")
    }

    /// Override the bot token from the first non-empty token variable.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = TOKEN_ENV_VARS
            .iter()
            .filter_map(|key| lookup(*key))
            .find(|value| !value.trim().is_empty())
        {
            self.telegram.bot_token = token.trim().to_string();
        }
    }

    /// Validate the configuration and build the endpoint URLs.
    pub fn endpoints(&self) -> Result<Endpoints> {
        let token = self.telegram.bot_token.trim();
        if token.is_empty() {
            anyhow::bail!(
                "Telegram bot token is not configured (set telegram.bot_token or {})",
                TOKEN_ENV_VARS[0]
            );
        }

        let fact = Url::parse(&self.content.fact_url)
            .with_context(|| format!("Invalid content.fact_url: {}", self.content.fact_url))?;
        let joke = Url::parse(&self.content.joke_url)
            .with_context(|| format!("Invalid content.joke_url: {}", self.content.joke_url))?;

        let base = self.telegram.api_base_url.trim_end_matches('/');
        // The token is part of the path; keep it out of the error message.
        let send_message = Url::parse(&format!("{base}/bot{token}/sendMessage"))
            .with_context(|| format!("Invalid telegram.api_base_url: {base}"))?;

        Ok(Endpoints {
            fact,
            joke,
            send_message,
        })
    }
}
