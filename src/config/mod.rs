use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use url::Url;

/// Default upload ceiling: 500 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Transcription API settings
    pub openai: OpenAiConfig,

    /// Size and time limits
    pub limits: LimitsConfig,

    /// Webpage host denylist
    pub denylist: DenylistConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP address to bind
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,hyper=warn"`
    pub log_level: String,

    /// Emit log records as newline-delimited JSON
    pub log_json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// Bearer token for the transcription API
    pub api_key: String,

    /// Transcription endpoint URL
    pub endpoint: String,

    /// Model identifier sent with every upload
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest media file accepted for upload, in bytes
    pub max_upload_bytes: u64,

    /// Timeout for downloading the media
    pub fetch_timeout_secs: Option<u64>,

    /// Timeout for the transcription call
    pub upload_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DenylistConfig {
    /// Hosts rejected in addition to the built-in list
    pub extra_hosts: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            model: "whisper-1".to_string(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            fetch_timeout_secs: Some(300),
            upload_timeout_secs: Some(600),
        }
    }
}

impl Config {
    /// Load configuration: defaults, then the YAML file, then environment overrides.
    ///
    /// Not validated; the server calls [`Config::validate`] before binding.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::config_path(explicit_path)? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a YAML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs_err::create_dir_all(parent)?;
            }
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Location of the config file, if one should be read
    fn config_path(explicit_path: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            return Ok(Some(path.to_path_buf()));
        }

        // Current directory first for easy local runs
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(Some(local_config));
        }

        Ok(Self::default_path().filter(|path| path.exists()))
    }

    /// `<config dir>/url-transcriber/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("url-transcriber").join("config.yaml"))
    }

    /// Overlay values from the environment. `lookup` is `std::env::var` in production.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai.api_key = key;
        }
        if let Some(bind) = lookup("TRANSCRIBER_BIND") {
            self.server.bind_address = bind;
        }
        if let Some(level) = lookup("TRANSCRIBER_LOG") {
            self.server.log_level = level;
        }
        if let Some(json) = lookup("TRANSCRIBER_LOG_JSON") {
            self.server.log_json = json == "1" || json.eq_ignore_ascii_case("true");
        }
        if let Some(endpoint) = lookup("TRANSCRIBER_ENDPOINT") {
            self.openai.endpoint = endpoint;
        }
        if let Some(model) = lookup("TRANSCRIBER_MODEL") {
            self.openai.model = model;
        }
        if let Some(max) = lookup("TRANSCRIBER_MAX_UPLOAD_BYTES").and_then(|v| v.parse().ok()) {
            self.limits.max_upload_bytes = max;
        }
        if let Some(secs) = lookup("TRANSCRIBER_FETCH_TIMEOUT_SECS") {
            self.limits.fetch_timeout_secs = parse_timeout(&secs).unwrap_or(self.limits.fetch_timeout_secs);
        }
        if let Some(secs) = lookup("TRANSCRIBER_UPLOAD_TIMEOUT_SECS") {
            self.limits.upload_timeout_secs = parse_timeout(&secs).unwrap_or(self.limits.upload_timeout_secs);
        }
        if let Some(hosts) = lookup("TRANSCRIBER_DENY_HOSTS") {
            self.denylist.extra_hosts.extend(
                hosts
                    .split(',')
                    .map(str::trim)
                    .filter(|host| !host.is_empty())
                    .map(str::to_string),
            );
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.openai.api_key.trim().is_empty() {
            anyhow::bail!("OpenAI API key must be configured (set OPENAI_API_KEY)");
        }

        self.bind_addr()?;

        let endpoint = Url::parse(&self.openai.endpoint)
            .with_context(|| format!("Invalid transcription endpoint: {}", self.openai.endpoint))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            anyhow::bail!("Transcription endpoint must use HTTP or HTTPS protocol");
        }

        if self.limits.max_upload_bytes == 0 {
            anyhow::bail!("max_upload_bytes must be greater than zero");
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind_address
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.server.bind_address))
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Bind Address: {}", self.server.bind_address);
        println!("  Log Level: {}", self.server.log_level);
        println!("  JSON Logs: {}", self.server.log_json);
        println!("  Endpoint: {}", self.openai.endpoint);
        println!("  Model: {}", self.openai.model);
        println!("  API Key: {}", redact(&self.openai.api_key));
        println!("  Max Upload: {}", crate::utils::format_file_size(self.limits.max_upload_bytes));
        if !self.denylist.extra_hosts.is_empty() {
            println!("  Extra Denied Hosts: {}", self.denylist.extra_hosts.join(", "));
        }
    }
}

/// `0` disables the timeout
fn parse_timeout(value: &str) -> Option<Option<u64>> {
    match value.trim().parse::<u64>() {
        Ok(0) => Some(None),
        Ok(secs) => Some(Some(secs)),
        Err(_) => None,
    }
}

fn redact(secret: &str) -> String {
    if secret.is_empty() {
        "<not set>".to_string()
    } else if secret.len() <= 8 {
        "****".to_string()
    } else {
        let prefix: String = secret.chars().take(3).collect();
        format!("{prefix}****")
    }
}
