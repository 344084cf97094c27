//! Main WHOIS proxy client.
//!
//! This module provides the `WhoisProxy` struct that ties the tunnel, the
//! query loop and field extraction together behind a small public API.

use crate::error::WhoisProxyError;
use crate::extract;
use crate::protocols::tunnel::{Connector, TcpConnector};
use crate::protocols::whois;
use crate::types::{ClientConfig, PatternList, ProxyOptions, QueryOutcome};
use tracing::debug;

/// Client that sends WHOIS queries through a CONNECT proxy.
///
/// The configuration is fixed once the client is built. The only mutator,
/// `set_max_loop`, needs `&mut self`, so it cannot race with a query that is
/// borrowing the client.
///
/// # Example
///
/// ```rust,no_run
/// use whois_proxy_lib::{ProxyOptions, WhoisProxy};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = WhoisProxy::new(ProxyOptions::default().host("10.0.0.5").port(3128));
///     let server = client.get_whois_server("example.com", None).await?;
///     println!("Referral: {:?}", server);
///     Ok(())
/// }
/// ```
pub struct WhoisProxy<C = TcpConnector> {
    /// Proxy endpoint, timeouts, default server and loop bound
    config: ClientConfig,
    /// Labels tried in order by `get_whois_server`
    patterns: PatternList,
    /// Opens the connection to the proxy
    connector: C,
}

impl WhoisProxy {
    /// Create a client from construction options.
    ///
    /// Unset options default to `127.0.0.1:8080` with a 10 second timeout.
    /// The default server is `whois.iana.org` and the loop bound is 512.
    pub fn new(options: ProxyOptions) -> Self {
        Self::with_config(ClientConfig::from_options(&options))
    }

    /// Create a client with a complete configuration.
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config,
            patterns: PatternList::default(),
            connector: TcpConnector,
        }
    }
}

impl Default for WhoisProxy {
    fn default() -> Self {
        Self::with_config(ClientConfig::default())
    }
}

impl<C: Connector> WhoisProxy<C> {
    /// Replace the transport used to reach the proxy.
    pub fn with_connector<D: Connector>(self, connector: D) -> WhoisProxy<D> {
        WhoisProxy {
            config: self.config,
            patterns: self.patterns,
            connector,
        }
    }

    /// Replace the pattern list used by `get_whois_server`.
    pub fn with_patterns(mut self, patterns: PatternList) -> Self {
        self.patterns = patterns;
        self
    }

    /// Set the read-loop bound. Zero is raised to one.
    pub fn with_max_loop(mut self, max_loop: usize) -> Self {
        self.config = self.config.with_max_loop(max_loop);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn patterns(&self) -> &PatternList {
        &self.patterns
    }

    /// Current read-loop bound.
    pub fn max_loop(&self) -> usize {
        self.config.max_loop
    }

    /// Change the read-loop bound. Zero is raised to one.
    pub fn set_max_loop(&mut self, max_loop: usize) {
        self.config.max_loop = max_loop.max(1);
    }

    /// See [`extract::parse_value`].
    pub fn parse_value(&self, key: &str, haystack: &str) -> Option<String> {
        extract::parse_value(key, haystack)
    }

    /// Query `server` (or the default server) for `domain` and return the raw reply.
    ///
    /// The text may be incomplete if the peer kept the stream open past the
    /// loop bound; use `query_whois_detailed` to find out.
    ///
    /// # Errors
    ///
    /// - `Connection` if the proxy cannot be reached
    /// - `Io` / `Timeout` if the exchange fails mid-session
    /// - `InvalidDomain` if `domain` is blank
    pub async fn query_whois(
        &self,
        domain: &str,
        server: Option<&str>,
    ) -> Result<String, WhoisProxyError> {
        self.query_whois_detailed(domain, server)
            .await
            .map(|outcome| outcome.text)
    }

    /// Like `query_whois`, but also reports how the read loop ended.
    pub async fn query_whois_detailed(
        &self,
        domain: &str,
        server: Option<&str>,
    ) -> Result<QueryOutcome, WhoisProxyError> {
        whois::query(&self.connector, domain, server, &self.config).await
    }

    /// Query once and return the first value matched by the pattern list.
    ///
    /// Resolves a single hop only. To follow a referral, call again with the
    /// returned server.
    pub async fn get_whois_server(
        &self,
        domain: &str,
        server: Option<&str>,
    ) -> Result<Option<String>, WhoisProxyError> {
        let text = self.query_whois(domain, server).await?;
        let referral = extract::resolve_referral_server(&text, &self.patterns);
        debug!(domain, referral = ?referral, "referral lookup finished");
        Ok(referral)
    }
}
