use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_YAHOO_COOKIE_URL: &str = "https://fc.yahoo.com";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

fn default_base_url() -> String {
    DEFAULT_YAHOO_BASE_URL.to_string()
}

fn default_cookie_url() -> String {
    DEFAULT_YAHOO_COOKIE_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct YahooProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Page visited before the crumb request to obtain session cookies
    #[serde(default = "default_cookie_url")]
    pub cookie_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for YahooProviderConfig {
    fn default() -> Self {
        YahooProviderConfig {
            base_url: default_base_url(),
            cookie_url: default_cookie_url(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub yahoo: YahooProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct GatewayConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Upper bound on in-flight ticker fetches; unbounded when absent
    pub max_concurrency: Option<usize>,
}

impl GatewayConfig {
    /// Loads the config from the default location, falling back to defaults
    /// when no file has been written there.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "stockgate", "stockgate")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
providers:
  yahoo:
    base_url: "http://example.com/yahoo"
    cookie_url: "http://example.com/cookie"
max_concurrency: 4
"#;

        let config: GatewayConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.providers.yahoo.base_url, "http://example.com/yahoo");
        assert_eq!(config.providers.yahoo.cookie_url, "http://example.com/cookie");
        assert_eq!(config.providers.yahoo.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.max_concurrency, Some(4));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: GatewayConfig = serde_yaml::from_str("{}").expect("Failed to deserialize");
        assert_eq!(config, GatewayConfig::default());
        assert_eq!(config.providers.yahoo.base_url, DEFAULT_YAHOO_BASE_URL);
        assert_eq!(config.providers.yahoo.cookie_url, DEFAULT_YAHOO_COOKIE_URL);
        assert!(config.max_concurrency.is_none());
    }

    #[test]
    fn test_default_user_agent_is_a_browser() {
        let config = YahooProviderConfig::default();
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
        assert!(config.user_agent.contains("Chrome/"));
    }

    #[test]
    fn test_load_from_path() {
        let file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        fs::write(file.path(), "max_concurrency: 2\n").expect("Failed to write config");

        let config = GatewayConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.max_concurrency, Some(2));
        assert_eq!(config.providers.yahoo, YahooProviderConfig::default());
    }

    #[test]
    fn test_load_from_path_reports_parse_errors() {
        let file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        fs::write(file.path(), "max_concurrency: [not, a, number]\n")
            .expect("Failed to write config");

        let err = GatewayConfig::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse config file"));
    }

    #[test]
    fn test_load_from_missing_path() {
        let err = GatewayConfig::load_from_path("/nonexistent/stockgate.yaml").unwrap_err();
        assert!(err.to_string().starts_with("Failed to read config file"));
    }
}
