//! Core data types for proxied WHOIS lookups.
//!
//! This module defines the client configuration, the construction options
//! callers pass in, the ordered pattern list used for field extraction, and
//! the detailed result of a single query round trip.

use serde::Serialize;
use std::time::Duration;

/// Default proxy host when none is configured.
pub const DEFAULT_PROXY_HOST: &str = "127.0.0.1";

/// Default proxy port when none is configured.
pub const DEFAULT_PROXY_PORT: u16 = 8080;

/// Default connect timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Server queried when the caller does not name one.
pub const DEFAULT_WHOIS_SERVER: &str = "whois.iana.org";

/// Default upper bound on read-loop iterations.
pub const DEFAULT_MAX_LOOP: usize = 512;

/// Labels tried, in order, when no pattern list is configured.
pub const DEFAULT_WHOIS_PATTERNS: &[&str] = &[
    "whois:",
    "refer:",
    "registrar whois server:",
    "whois server:",
];

/// Configuration for a `WhoisProxy` client.
///
/// Built once per client and never changed while a query is running.
/// Zero durations and a zero loop bound are clamped up to their minimum by
/// the builder methods, so `max_loop > 0` and both timeouts are positive.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Proxy host name or IP address
    /// Default: "127.0.0.1"
    pub proxy_host: String,

    /// Proxy TCP port
    /// Default: 8080
    pub proxy_port: u16,

    /// Bound on establishing the TCP connection to the proxy
    /// Default: 10 seconds
    pub timeout: Duration,

    /// Bound on each individual line read inside the query loop
    /// Default: 10 seconds
    pub read_timeout: Duration,

    /// WHOIS server used when a query names none
    /// Default: "whois.iana.org"
    pub default_server: String,

    /// Safety valve against peers that never close the stream
    /// Default: 512
    pub max_loop: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            proxy_host: DEFAULT_PROXY_HOST.to_string(),
            proxy_port: DEFAULT_PROXY_PORT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            default_server: DEFAULT_WHOIS_SERVER.to_string(),
            max_loop: DEFAULT_MAX_LOOP,
        }
    }
}

impl ClientConfig {
    /// Build a configuration from construction options, filling gaps with defaults.
    pub fn from_options(options: &ProxyOptions) -> Self {
        let mut config = Self::default();
        if let Some(host) = &options.host {
            config.proxy_host = host.clone();
        }
        if let Some(port) = options.port {
            config.proxy_port = port;
        }
        if let Some(timeout) = options.timeout {
            config = config.with_timeout(timeout);
        }
        config
    }

    /// Set the proxy endpoint.
    pub fn with_proxy<H: Into<String>>(mut self, host: H, port: u16) -> Self {
        self.proxy_host = host.into();
        self.proxy_port = port;
        self
    }

    /// Set the connect timeout. Zero is raised to one second.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = nonzero_or_one_second(timeout);
        self
    }

    /// Set the per-line read timeout. Zero is raised to one second.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = nonzero_or_one_second(read_timeout);
        self
    }

    /// Set the server queried when none is given.
    pub fn with_default_server<S: Into<String>>(mut self, server: S) -> Self {
        self.default_server = server.into();
        self
    }

    /// Set the read-loop bound. Zero is raised to one.
    pub fn with_max_loop(mut self, max_loop: usize) -> Self {
        self.max_loop = max_loop.max(1);
        self
    }

    /// `host:port` of the proxy, as used in logs and errors.
    pub fn proxy_addr(&self) -> String {
        format!("{}:{}", self.proxy_host, self.proxy_port)
    }
}

fn nonzero_or_one_second(timeout: Duration) -> Duration {
    if timeout.is_zero() {
        Duration::from_secs(1)
    } else {
        timeout
    }
}

/// Options recognized when constructing a client.
///
/// Every field is optional; unset fields take the defaults
/// (`127.0.0.1`, `8080`, 10 seconds).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProxyOptions {
    /// Proxy host / IP
    pub host: Option<String>,
    /// Proxy port
    pub port: Option<u16>,
    /// Connection timeout
    pub timeout: Option<Duration>,
}

impl ProxyOptions {
    pub fn host<H: Into<String>>(mut self, host: H) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Ordered list of field labels used to pull values out of WHOIS text.
///
/// Labels are stored lowercase because matching runs against lowercased
/// text. Order is priority: the first label that matches wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternList {
    labels: Vec<String>,
}

impl PatternList {
    /// Build a list from labels, lowercasing them and dropping blank ones.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels = labels
            .into_iter()
            .map(|label| label.as_ref().to_lowercase())
            .filter(|label| !label.trim().is_empty())
            .collect();
        Self { labels }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl Default for PatternList {
    fn default() -> Self {
        Self::new(DEFAULT_WHOIS_PATTERNS.iter().copied())
    }
}

/// Raw text of one query round trip plus how the read loop ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    /// Accumulated response, one trimmed line per platform line terminator
    pub text: String,

    /// Number of line reads performed, including the one that saw end of data
    pub lines_read: usize,

    /// True when the loop stopped on the iteration bound instead of end of data.
    /// The text may then be incomplete.
    pub truncated: bool,
}
