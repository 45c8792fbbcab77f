use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_AGENT: &str = "kibitoc/0.2";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct TocConfig {
    #[serde(default)]
    pub kibela: KibelaSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct KibelaSection {
    pub team: Option<String>,
    pub token: Option<String>,
    pub api_url: Option<String>,
    pub user_agent: Option<String>,
}

/// Fully resolved Kibela connection settings, passed into the client
/// constructor so nothing reads credentials ambiently after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KibelaEndpoint {
    pub team: String,
    pub token: String,
    pub api_url: String,
    pub base_url: String,
    pub user_agent: String,
}

impl TocConfig {
    /// Resolve the team name: env KIBELA_TEAM > config.
    pub fn team(&self) -> Option<String> {
        env_value("KIBELA_TEAM").or_else(|| self.kibela.team.clone())
    }

    /// Resolve the access token: env KIBELA_TOKEN > config.
    pub fn token(&self) -> Option<String> {
        env_value("KIBELA_TOKEN").or_else(|| self.kibela.token.clone())
    }

    /// Resolve an API URL override: env KIBELA_API_URL > config > None.
    pub fn api_url(&self) -> Option<String> {
        env_value("KIBELA_API_URL").or_else(|| self.kibela.api_url.clone())
    }

    /// Resolve user agent: env KIBELA_USER_AGENT > config > DEFAULT_USER_AGENT.
    pub fn user_agent(&self) -> String {
        env_value("KIBELA_USER_AGENT")
            .or_else(|| self.kibela.user_agent.clone())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }

    /// Resolve the full endpoint. Team and token are required; the API URL
    /// defaults to `https://<team>.kibe.la/api/v1`.
    pub fn resolve(&self) -> Result<KibelaEndpoint> {
        let Some(team) = self.team() else {
            bail!(
                "KIBELA_TEAM is required (set the environment variable or `team` under [kibela] in the config file)"
            );
        };
        let Some(token) = self.token() else {
            bail!(
                "KIBELA_TOKEN is required (set the environment variable or `token` under [kibela] in the config file)"
            );
        };
        let base_url = format!("https://{team}.kibe.la");
        let api_url = self
            .api_url()
            .unwrap_or_else(|| format!("{base_url}/api/v1"));
        Ok(KibelaEndpoint {
            team,
            token,
            api_url,
            base_url,
            user_agent: self.user_agent(),
        })
    }
}

/// Load a TocConfig from a TOML file. Returns default if the file is absent.
pub fn load_config(config_path: &Path) -> Result<TocConfig> {
    if !config_path.exists() {
        return Ok(TocConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: TocConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

fn env_value(name: &str) -> Option<String> {
    let value = env::var(name).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
