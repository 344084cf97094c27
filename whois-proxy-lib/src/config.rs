//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `WP_*`
//! environment variables, and merging them with proper precedence rules.
//! The pattern list used for referral extraction lives here too, under
//! `[patterns] whois`.

use crate::error::WhoisProxyError;
use crate::types::{ClientConfig, PatternList};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Proxy endpoint and query loop settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,

    /// Ordered field labels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns: Option<PatternsConfig>,
}

/// `[proxy]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProxyConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Connect timeout (as string, e.g., "5s", "30s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Per-line read timeout (as string, e.g., "5s", "30s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_loop: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_server: Option<String>,
}

/// `[patterns]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PatternsConfig {
    /// Labels tried in order when looking for a referral server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois: Option<Vec<String>>,
}

impl FileConfig {
    /// Overlay the values set in this file onto `config`.
    ///
    /// Call `ConfigManager::load_file` (which validates) before this; values
    /// that fail to parse here are skipped.
    pub fn apply_to(&self, mut config: ClientConfig) -> ClientConfig {
        let Some(proxy) = &self.proxy else {
            return config;
        };

        if let Some(host) = &proxy.host {
            config.proxy_host = host.clone();
        }
        if let Some(port) = proxy.port {
            config.proxy_port = port;
        }
        if let Some(timeout) = proxy.timeout.as_deref().and_then(parse_timeout_string) {
            config = config.with_timeout(timeout);
        }
        if let Some(read_timeout) = proxy.read_timeout.as_deref().and_then(parse_timeout_string) {
            config = config.with_read_timeout(read_timeout);
        }
        if let Some(max_loop) = proxy.max_loop {
            config = config.with_max_loop(max_loop);
        }
        if let Some(server) = &proxy.default_server {
            config.default_server = server.clone();
        }
        config
    }

    /// The configured pattern list, if the file sets one.
    pub fn pattern_list(&self) -> Option<PatternList> {
        self.patterns
            .as_ref()
            .and_then(|p| p.whois.as_ref())
            .map(PatternList::new)
    }
}

/// Configuration discovery and loading functionality.
#[derive(Debug, Default)]
pub struct ConfigManager;

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new() -> Self {
        Self
    }

    /// Load and validate configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, WhoisProxyError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(WhoisProxyError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            WhoisProxyError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            WhoisProxyError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;

        debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is lowest, then the home directory file, then the file in
    /// the current directory. Files that fail to load are skipped with a warning.
    pub fn discover_and_load(&self) -> Result<FileConfig, WhoisProxyError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping configuration file"),
            }
        }

        if loaded_files.len() > 1 {
            info!(
                files = ?loaded_files,
                "multiple config files found, later files take precedence"
            );
        }

        Ok(merged_config)
    }

    /// Configuration file in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./whois-proxy.toml", "./.whois-proxy.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Configuration file in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        let candidates = [".whois-proxy.toml", "whois-proxy.toml"];

        candidates
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("whois-proxy").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations; values from `higher` win.
    ///
    /// A pattern list is replaced as a whole, never concatenated, because
    /// order decides priority.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            proxy: match (lower.proxy, higher.proxy) {
                (Some(mut lower_proxy), Some(higher_proxy)) => {
                    if higher_proxy.host.is_some() {
                        lower_proxy.host = higher_proxy.host;
                    }
                    if higher_proxy.port.is_some() {
                        lower_proxy.port = higher_proxy.port;
                    }
                    if higher_proxy.timeout.is_some() {
                        lower_proxy.timeout = higher_proxy.timeout;
                    }
                    if higher_proxy.read_timeout.is_some() {
                        lower_proxy.read_timeout = higher_proxy.read_timeout;
                    }
                    if higher_proxy.max_loop.is_some() {
                        lower_proxy.max_loop = higher_proxy.max_loop;
                    }
                    if higher_proxy.default_server.is_some() {
                        lower_proxy.default_server = higher_proxy.default_server;
                    }
                    Some(lower_proxy)
                }
                (None, Some(higher_proxy)) => Some(higher_proxy),
                (Some(lower_proxy), None) => Some(lower_proxy),
                (None, None) => None,
            },
            patterns: match (lower.patterns, higher.patterns) {
                (Some(lower_patterns), Some(higher_patterns)) => Some(PatternsConfig {
                    whois: higher_patterns.whois.or(lower_patterns.whois),
                }),
                (lower_patterns, higher_patterns) => higher_patterns.or(lower_patterns),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), WhoisProxyError> {
        if let Some(proxy) = &config.proxy {
            if proxy.port == Some(0) {
                return Err(WhoisProxyError::config("Proxy port must be between 1 and 65535"));
            }

            if let Some(host) = &proxy.host {
                if host.trim().is_empty() {
                    return Err(WhoisProxyError::config("Proxy host cannot be empty"));
                }
            }

            for (name, value) in [("timeout", &proxy.timeout), ("read_timeout", &proxy.read_timeout)] {
                if let Some(timeout_str) = value {
                    if parse_timeout_string(timeout_str).is_none() {
                        return Err(WhoisProxyError::config(format!(
                            "Invalid {} '{}'. Use a non-zero value like '5s', '30s', '2m'",
                            name, timeout_str
                        )));
                    }
                }
            }

            if proxy.max_loop == Some(0) {
                return Err(WhoisProxyError::config("max_loop must be at least 1"));
            }
        }

        if let Some(labels) = config.patterns.as_ref().and_then(|p| p.whois.as_ref()) {
            if labels.iter().any(|label| label.trim().is_empty()) {
                return Err(WhoisProxyError::config("Pattern labels cannot be empty"));
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// Represents values set via `WP_*` environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub max_loop: Option<usize>,
    pub default_server: Option<String>,
    pub patterns: Option<Vec<String>>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Overlay the values set in the environment onto `config`.
    pub fn apply_to(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(host) = &self.host {
            config.proxy_host = host.clone();
        }
        if let Some(port) = self.port {
            config.proxy_port = port;
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        if let Some(read_timeout) = self.read_timeout {
            config = config.with_read_timeout(read_timeout);
        }
        if let Some(max_loop) = self.max_loop {
            config = config.with_max_loop(max_loop);
        }
        if let Some(server) = &self.default_server {
            config.default_server = server.clone();
        }
        config
    }

    /// The pattern list from `WP_PATTERNS`, if set.
    pub fn pattern_list(&self) -> Option<PatternList> {
        self.patterns.as_ref().map(PatternList::new)
    }
}

/// Load configuration from environment variables.
///
/// Parses all `WP_*` environment variables. Invalid values are logged as
/// warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    // WP_PROXY_HOST - proxy host / IP
    if let Some(host) = lookup("WP_PROXY_HOST") {
        if !host.trim().is_empty() {
            debug!(value = %host, "using WP_PROXY_HOST");
            env_config.host = Some(host.trim().to_string());
        }
    }

    // WP_PROXY_PORT - proxy port
    if let Some(val) = lookup("WP_PROXY_PORT") {
        match val.trim().parse::<u16>() {
            Ok(port) if port > 0 => {
                debug!(port, "using WP_PROXY_PORT");
                env_config.port = Some(port);
            }
            _ => warn!(value = %val, "invalid WP_PROXY_PORT, must be 1-65535"),
        }
    }

    // WP_TIMEOUT / WP_READ_TIMEOUT - "5s", "30s", "2m"
    if let Some(val) = lookup("WP_TIMEOUT") {
        match parse_timeout_string(&val) {
            Some(timeout) => env_config.timeout = Some(timeout),
            None => warn!(value = %val, "invalid WP_TIMEOUT, use format like '5s', '30s', '2m'"),
        }
    }
    if let Some(val) = lookup("WP_READ_TIMEOUT") {
        match parse_timeout_string(&val) {
            Some(timeout) => env_config.read_timeout = Some(timeout),
            None => {
                warn!(value = %val, "invalid WP_READ_TIMEOUT, use format like '5s', '30s', '2m'")
            }
        }
    }

    // WP_MAX_LOOP - read loop bound
    if let Some(val) = lookup("WP_MAX_LOOP") {
        match val.trim().parse::<usize>() {
            Ok(max_loop) if max_loop > 0 => env_config.max_loop = Some(max_loop),
            _ => warn!(value = %val, "invalid WP_MAX_LOOP, must be a positive integer"),
        }
    }

    // WP_DEFAULT_SERVER - server queried when none is given
    if let Some(server) = lookup("WP_DEFAULT_SERVER") {
        if !server.trim().is_empty() {
            env_config.default_server = Some(server.trim().to_string());
        }
    }

    // WP_PATTERNS - comma-separated labels
    if let Some(pattern_str) = lookup("WP_PATTERNS") {
        let patterns: Vec<String> = pattern_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !patterns.is_empty() {
            env_config.patterns = Some(patterns);
        }
    }

    // WP_CONFIG - explicit config file
    if let Some(config_path) = lookup("WP_CONFIG") {
        if !config_path.trim().is_empty() {
            env_config.config = Some(config_path);
        }
    }

    env_config
}

/// Parse a timeout string like "5s", "30s", "2m" (bare numbers are seconds).
///
/// Returns `None` for unparsable or zero values.
pub fn parse_timeout_string(timeout_str: &str) -> Option<Duration> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let seconds = if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.parse::<u64>().ok()?
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.parse::<u64>().ok()?.checked_mul(60)?
    } else {
        timeout_str.parse::<u64>().ok()?
    };

    if seconds == 0 {
        None
    } else {
        Some(Duration::from_secs(seconds))
    }
}
