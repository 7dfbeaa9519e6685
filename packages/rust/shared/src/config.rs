//! Application configuration for SiteSignal.
//!
//! User config lives at `~/.sitesignal/sitesignal.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiteSignalError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sitesignal.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sitesignal";

/// Desktop Chrome user agent sent by both transports unless overridden.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Config structs (matching sitesignal.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Page acquisition settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Headless browser settings.
    #[serde(default)]
    pub render: RenderConfig,

    /// Batch run settings.
    #[serde(default)]
    pub batch: BatchConfig,

    /// OpenRouter settings for AI summaries.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Optional content validators.
    #[serde(default)]
    pub validators: ValidatorConfig,
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-attempt timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum attempts per URL.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Use the rendering transport when a browser is available.
    #[serde(default = "default_true")]
    pub prefer_rendering: bool,

    /// User-Agent header / browser UA override.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Permit loopback and private-network targets.
    #[serde(default)]
    pub allow_private_hosts: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            prefer_rendering: true,
            user_agent: default_user_agent(),
            allow_private_hosts: false,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_true() -> bool {
    true
}

/// `[render]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Whether to launch a headless browser at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Explicit Chrome/Chromium binary. Falls back to `CHROME_PATH`, then auto-detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,

    /// Run Chrome with its sandbox (disable inside containers).
    #[serde(default = "default_true")]
    pub sandbox: bool,

    /// Extra wait after navigation for client-side scripts to settle.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chrome_path: None,
            sandbox: true,
            settle_ms: default_settle_ms(),
        }
    }
}

fn default_settle_ms() -> u64 {
    2000
}

/// `[batch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Delay between consecutive sites in a batch.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_delay_ms() -> u64 {
    2000
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for summaries.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// OpenAI-compatible API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            default_model: default_model(),
            base_url: default_base_url(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}

/// `[validators]` section. Every validator is off unless enabled here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Reject pages that look like placeholder / parked content.
    #[serde(default)]
    pub placeholder_content: bool,

    /// Replace generic company names ("Home", "Welcome") with a host-derived name.
    #[serde(default)]
    pub generic_company_name: bool,

    /// Minimum plain-text length for the placeholder check.
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            placeholder_content: false,
            generic_company_name: false,
            min_text_chars: default_min_text_chars(),
        }
    }
}

fn default_min_text_chars() -> usize {
    200
}

// ---------------------------------------------------------------------------
// Fetch options (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Per-call fetch options. Immutable for the duration of a fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Hard timeout for a single attempt.
    pub timeout: Duration,
    /// Maximum number of attempts.
    pub max_retries: u32,
    /// Prefer the rendering transport when one is available.
    pub prefer_rendering: bool,
    /// User-Agent presented to the target site.
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.fetch.timeout_secs),
            max_retries: config.fetch.max_retries,
            prefer_rendering: config.fetch.prefer_rendering && config.render.enabled,
            user_agent: config.fetch.user_agent.clone(),
        }
    }
}

impl From<&AppConfig> for RenderConfig {
    fn from(config: &AppConfig) -> Self {
        config.render.clone()
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sitesignal/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SiteSignalError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.sitesignal/sitesignal.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SiteSignalError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SiteSignalError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SiteSignalError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SiteSignalError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SiteSignalError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the OpenRouter API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(SiteSignalError::config(format!(
            "OpenRouter API key not found. Set the {var_name} environment variable \
             or pass --no-ai."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("timeout_secs"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.fetch.max_retries, 3);
        assert_eq!(parsed.batch.delay_ms, 2000);
        assert!(!parsed.validators.placeholder_content);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[fetch]
max_retries = 5
prefer_rendering = false

[validators]
generic_company_name = true
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.fetch.max_retries, 5);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert!(!config.fetch.prefer_rendering);
        assert!(config.validators.generic_company_name);
        assert!(!config.validators.placeholder_content);
        assert_eq!(config.validators.min_text_chars, 200);
    }

    #[test]
    fn fetch_options_from_app_config() {
        let mut app = AppConfig::default();
        let opts = FetchOptions::from(&app);
        assert_eq!(opts.timeout, Duration::from_secs(30));
        assert_eq!(opts.max_retries, 3);
        assert!(opts.prefer_rendering);

        app.render.enabled = false;
        let opts = FetchOptions::from(&app);
        assert!(!opts.prefer_rendering);
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.openrouter.api_key_env = "SITESIGNAL_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
