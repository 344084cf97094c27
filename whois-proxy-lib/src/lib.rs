//! # WHOIS Proxy Library
//!
//! WHOIS lookups routed through an intermediate proxy, plus referral server
//! discovery from the unstructured reply text.
//!
//! Each query opens a fresh connection to the proxy, writes
//! `CONNECT <SERVER>:43` followed by the query line, and reads the reply
//! until the peer closes the stream or a configurable line bound is reached.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use whois_proxy_lib::{ProxyOptions, WhoisProxy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WhoisProxy::new(ProxyOptions::default().port(3128));
//!
//!     let raw = client.query_whois("example.com", None).await?;
//!     println!("{}", raw);
//!
//!     let referral = client.get_whois_server("example.com", None).await?;
//!     println!("Referral: {:?}", referral);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **CONNECT Tunnel**: raw byte stream to any WHOIS server via the proxy
//! - **Bounded Reads**: the read loop stops after a configurable number of lines
//! - **Ordered Patterns**: first matching label wins
//! - **Configurable**: TOML files and `WP_*` environment variables

// Re-export main public API types and functions
// This makes them available as whois_proxy_lib::TypeName
pub use client::WhoisProxy;
pub use config::{
    load_env_config, parse_timeout_string, ConfigManager, EnvConfig, FileConfig, PatternsConfig,
    ProxyConfig,
};
pub use error::WhoisProxyError;
pub use extract::{parse_value, resolve_referral_server};
pub use protocols::{Connector, ProxyTunnel, TcpConnector, LINE_ENDING, WHOIS_PORT};
pub use types::{
    ClientConfig, PatternList, ProxyOptions, QueryOutcome, DEFAULT_MAX_LOOP, DEFAULT_PROXY_HOST,
    DEFAULT_PROXY_PORT, DEFAULT_WHOIS_PATTERNS, DEFAULT_WHOIS_SERVER,
};

// Public modules
pub mod protocols;

// Internal modules - these are not part of the public API
mod client;
mod config;
mod error;
mod extract;
mod types;

#[cfg(test)]
mod test_support;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, WhoisProxyError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// Get library information for debugging or display purposes.
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        author: AUTHOR,
        default_server: DEFAULT_WHOIS_SERVER,
        whois_port: WHOIS_PORT,
    }
}

/// Information about the library build
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub version: &'static str,
    pub author: &'static str,
    pub default_server: &'static str,
    pub whois_port: u16,
}
