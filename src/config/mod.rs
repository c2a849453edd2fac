// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{
    DEFAULT_API_URL, DEFAULT_IMAGE_QUALITY, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SERVER_ADDRESS,
    DEFAULT_SERVER_PORT, DEFAULT_SNIPPET_PATH, DEFAULT_WEBHOOK_ICON, DEFAULT_WEBHOOK_TIMEOUT_SECS,
    DEFAULT_WEBHOOK_USERNAME, RECV_SNIPPET_FILE,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub fastly: FastlyConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub webhooks: WebhookConfig,
    #[serde(default)]
    pub snippets: SnippetConfig,
}

/// Admin endpoint bind configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_address")]
    pub address: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_address() -> String {
    DEFAULT_SERVER_ADDRESS.to_string()
}

fn default_server_port() -> u16 {
    DEFAULT_SERVER_PORT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_server_address(),
            port: default_server_port(),
        }
    }
}

/// Fastly API access configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FastlyConfig {
    /// API base URL (override for testing against a local stub)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Service whose versions this instance manages
    pub service_id: String,

    /// API token sent in the Fastly-Key header
    pub api_token: String,

    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Image optimizer settings source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// JPEG quality pushed to the optimizer, 1-100 (default: 85)
    #[serde(default = "default_image_quality")]
    pub quality: u8,
}

fn default_image_quality() -> u8 {
    DEFAULT_IMAGE_QUALITY
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            quality: default_image_quality(),
        }
    }
}

/// Webhook notification configuration
///
/// Notifications fire only when both `enabled` and `publish_config_changes`
/// are set. The two flags are independent: `enabled` turns the channel on,
/// `publish_config_changes` opts configuration-change messages into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub publish_config_changes: bool,

    /// Incoming-webhook endpoint URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Channel override for the webhook message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    /// Username the message is posted as (default: fastly)
    #[serde(default = "default_webhook_username")]
    pub username: String,

    /// Emoji attached to the message (default: :airplane:)
    #[serde(default = "default_webhook_icon")]
    pub icon_emoji: String,

    /// Delivery timeout in seconds (default: 10)
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_webhook_username() -> String {
    DEFAULT_WEBHOOK_USERNAME.to_string()
}

fn default_webhook_icon() -> String {
    DEFAULT_WEBHOOK_ICON.to_string()
}

fn default_webhook_timeout_secs() -> u64 {
    DEFAULT_WEBHOOK_TIMEOUT_SECS
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            publish_config_changes: false,
            url: None,
            channel: None,
            username: default_webhook_username(),
            icon_emoji: default_webhook_icon(),
            timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

/// VCL snippet template source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnippetConfig {
    /// Directory holding the snippet templates
    #[serde(default = "default_snippet_path")]
    pub path: String,

    /// Specific template file to load; `None` loads every `.vcl` file in
    /// the directory
    #[serde(default = "default_snippet_file")]
    pub file: Option<String>,
}

fn default_snippet_path() -> String {
    DEFAULT_SNIPPET_PATH.to_string()
}

fn default_snippet_file() -> Option<String> {
    Some(RECV_SNIPPET_FILE.to_string())
}

impl Default for SnippetConfig {
    fn default() -> Self {
        Self {
            path: default_snippet_path(),
            file: default_snippet_file(),
        }
    }
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        // Now perform the substitution (we know all vars exist)
        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap() // Safe because we checked above
        });

        let config: Config = serde_yaml::from_str(&substituted).map_err(|e| e.to_string())?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.fastly.service_id.is_empty() {
            return Err("fastly.service_id cannot be empty".to_string());
        }

        if self.fastly.api_token.is_empty() {
            return Err("fastly.api_token cannot be empty".to_string());
        }

        if self.fastly.api_url.is_empty() {
            return Err("fastly.api_url cannot be empty".to_string());
        }

        if self.image.quality == 0 || self.image.quality > 100 {
            return Err(format!(
                "image.quality must be between 1 and 100, got {}",
                self.image.quality
            ));
        }

        if self.webhooks.enabled && self.webhooks.url.is_none() {
            return Err("webhooks.url is required when webhooks are enabled".to_string());
        }

        if self.snippets.path.is_empty() {
            return Err("snippets.path cannot be empty".to_string());
        }

        Ok(())
    }
}
