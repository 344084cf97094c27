//! Network protocol implementations.
//!
//! This module contains the CONNECT tunnel to the proxy and the WHOIS
//! query/response exchange that runs over it.

/// CONNECT tunnel through the proxy
pub mod tunnel;

/// WHOIS query loop over a tunnel
pub mod whois;

// Re-export commonly used functions and types
pub use tunnel::{Connector, ProxyTunnel, TcpConnector, MAX_LINE_BYTES};
pub use whois::{LINE_ENDING, WHOIS_PORT};
