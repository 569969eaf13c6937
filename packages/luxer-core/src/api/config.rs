use crate::api::client::DEFAULT_BASE_URL;
use crate::model::Token;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable name for API base URL override
const ENV_API_URL: &str = "LUXER_API_URL";
/// Environment variable name for the account e-mail
const ENV_EMAIL: &str = "LUXER_EMAIL";
/// Environment variable name for a previously issued API token
const ENV_TOKEN: &str = "LUXER_TOKEN";

/// Default poll cadence in minutes
pub const DEFAULT_POLL_INTERVAL_MINUTES: u64 = 5;

/// Configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    api: Option<ApiSection>,
    account: Option<AccountSection>,
    poll: Option<PollSection>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiSection {
    /// Resident API base (e.g., "https://resident-api.luxerone.com/resident_api/v2")
    base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct AccountSection {
    email: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct PollSection {
    interval_minutes: Option<u64>,
}

/// Runtime API endpoint configuration
#[derive(Debug, Clone)]
pub struct ApiEndpointConfig {
    pub base_url: String,
    /// Source of the configuration (for logging)
    pub source: ConfigSource,
}

impl Default for ApiEndpointConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            source: ConfigSource::Default,
        }
    }
}

/// Account settings. The token is only ever read here; storing it is left to
/// the operator.
#[derive(Debug, Clone, Default)]
pub struct AccountConfig {
    pub email: Option<String>,
    pub token: Option<Token>,
}

/// Everything the CLI needs to build a client and a poller.
#[derive(Debug, Clone)]
pub struct LuxerConfig {
    pub endpoint: ApiEndpointConfig,
    pub account: AccountConfig,
    pub poll_interval: Duration,
}

/// Where the configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Using default hardcoded values
    Default,
    /// Loaded from environment variable
    Environment,
    /// Loaded from config file
    ConfigFile,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::ConfigFile => write!(f, "config file"),
        }
    }
}

/// Get the path to the configuration file
fn get_config_file_path() -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|p| p.join("luxer").join("config.toml"))
}

/// Parse configuration file contents
pub fn parse_config(content: &str) -> anyhow::Result<ConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Load configuration from the config file
fn load_config_file() -> Option<ConfigFile> {
    let path = get_config_file_path()?;

    if !path.exists() {
        return None;
    }

    match fs::read_to_string(&path) {
        Ok(content) => match parse_config(&content) {
            Ok(config) => {
                tracing::debug!("Loaded config from {:?}", path);
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Failed to parse config file {:?}: {}", path, e);
                None
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read config file {:?}: {}", path, e);
            None
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the API endpoint with priority:
/// 1. Environment variable (LUXER_API_URL)
/// 2. Config file (~/.config/luxer/config.toml)
/// 3. Default value
pub fn resolve_endpoint(env_url: Option<String>, file: Option<&ConfigFile>) -> ApiEndpointConfig {
    if let Some(url) = non_empty(env_url) {
        let url = url.trim_end_matches('/').to_string();
        tracing::info!("Using API URL from environment variable: {}", url);
        return ApiEndpointConfig {
            base_url: url,
            source: ConfigSource::Environment,
        };
    }

    let file_url = file
        .and_then(|f| f.api.as_ref())
        .and_then(|api| non_empty(api.base_url.clone()))
        .map(|u| u.trim_end_matches('/').to_string());
    if let Some(url) = file_url {
        tracing::info!("Using API URL from config file: {}", url);
        return ApiEndpointConfig {
            base_url: url,
            source: ConfigSource::ConfigFile,
        };
    }

    tracing::debug!("Using default API URL: {}", DEFAULT_BASE_URL);
    ApiEndpointConfig::default()
}

/// Resolve account settings; environment variables win over the file.
pub fn resolve_account(
    env_email: Option<String>,
    env_token: Option<String>,
    file: Option<&ConfigFile>,
) -> AccountConfig {
    let section = file.and_then(|f| f.account.as_ref());

    let email = non_empty(env_email).or_else(|| section.and_then(|s| non_empty(s.email.clone())));
    let token = non_empty(env_token)
        .or_else(|| section.and_then(|s| non_empty(s.token.clone())))
        .map(Token::new);

    AccountConfig { email, token }
}

pub fn resolve_poll_interval(file: Option<&ConfigFile>) -> Duration {
    let minutes = file
        .and_then(|f| f.poll.as_ref())
        .and_then(|p| p.interval_minutes)
        .filter(|m| *m > 0)
        .unwrap_or(DEFAULT_POLL_INTERVAL_MINUTES);
    Duration::from_secs(minutes * 60)
}

/// Load the full configuration from environment and config file.
pub fn load_config() -> LuxerConfig {
    let file = load_config_file();
    let file = file.as_ref();

    LuxerConfig {
        endpoint: resolve_endpoint(std::env::var(ENV_API_URL).ok(), file),
        account: resolve_account(
            std::env::var(ENV_EMAIL).ok(),
            std::env::var(ENV_TOKEN).ok(),
            file,
        ),
        poll_interval: resolve_poll_interval(file),
    }
}

/// Get the path to the config file for documentation purposes
pub fn get_config_file_path_string() -> String {
    get_config_file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "~/.config/luxer/config.toml".to_string())
}

/// Generate example config file content
pub fn generate_example_config() -> String {
    r#"# Luxer One poller configuration
# Place this file at: ~/.config/luxer/config.toml

[api]
# Resident API base URL
# Default: https://resident-api.luxerone.com/resident_api/v2
# base_url = "https://resident-api.luxerone.com/resident_api/v2"

[account]
# email = "you@example.com"
# Token printed by `luxer login`
# token = ""

[poll]
# interval_minutes = 5
"#
    .to_string()
}
