//! WHOIS protocol over a proxy tunnel.
//!
//! One query is one round trip: open a tunnel, ask the proxy to connect to
//! `SERVER:43`, send the query line, then drain the reply line by line until
//! the peer closes the stream or the iteration bound is hit.

use crate::error::WhoisProxyError;
use crate::protocols::tunnel::{Connector, ProxyTunnel, MAX_LINE_BYTES};
use crate::types::{ClientConfig, QueryOutcome};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

/// Well-known WHOIS port, appended to every CONNECT directive.
pub const WHOIS_PORT: u16 = 43;

/// Terminator appended after every line of accumulated response text.
#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// Trim and uppercase a query string. Empty input is rejected.
pub fn normalize_domain(domain: &str) -> Result<String, WhoisProxyError> {
    let trimmed = domain.trim();
    if trimmed.is_empty() {
        return Err(WhoisProxyError::invalid_domain(
            domain,
            "Domain name cannot be empty",
        ));
    }
    Ok(trimmed.to_uppercase())
}

/// Pick the server to query: `server` when given and non-blank, else the
/// configured default. The result is uppercased.
pub fn resolve_server(server: Option<&str>, config: &ClientConfig) -> String {
    server
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(config.default_server.as_str())
        .to_uppercase()
}

/// Run one query round trip through a fresh tunnel.
///
/// The tunnel is closed exactly once before returning, whether the loop ended
/// on end of data, on the iteration bound, or on an error.
pub async fn query<C>(
    connector: &C,
    domain: &str,
    server: Option<&str>,
    config: &ClientConfig,
) -> Result<QueryOutcome, WhoisProxyError>
where
    C: Connector,
{
    let domain = normalize_domain(domain)?;
    let server = resolve_server(server, config);

    let mut tunnel = ProxyTunnel::open_with(connector, config).await?;
    let result = exchange(&mut tunnel, &server, &domain, config).await;

    if let Err(e) = tunnel.close().await {
        // A shutdown failure never replaces the query result.
        warn!(error = %e, "failed to close proxy tunnel");
    }

    result
}

async fn exchange<S>(
    tunnel: &mut ProxyTunnel<S>,
    server: &str,
    domain: &str,
    config: &ClientConfig,
) -> Result<QueryOutcome, WhoisProxyError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    tunnel.request_tunnel(server, WHOIS_PORT).await?;
    tunnel.send_query(domain).await?;
    drain(tunnel, config).await
}

/// Read the reply until end of data or until more than `config.max_loop`
/// lines have been read, whichever comes first.
///
/// Every line is trimmed and followed by `LINE_ENDING`. The read that sees end
/// of data adds nothing, so an empty reply gives empty text rather than a lone
/// line terminator. Hitting the bound is not an error: the text gathered so
/// far is returned with `truncated` set.
///
/// Lines longer than `MAX_LINE_BYTES` arrive as several fragments. A UTF-8
/// sequence cut at a fragment boundary is carried over to the next fragment
/// so the character survives intact.
pub async fn drain<S>(
    tunnel: &mut ProxyTunnel<S>,
    config: &ClientConfig,
) -> Result<QueryOutcome, WhoisProxyError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut text = String::new();
    let mut lines_read = 0usize;
    let mut line = Vec::with_capacity(MAX_LINE_BYTES as usize + 4);
    let mut carry = Vec::new();

    loop {
        lines_read += 1;
        line.clear();
        line.append(&mut carry);

        let read = tokio::time::timeout(config.read_timeout, tunnel.read_line(&mut line))
            .await
            .map_err(|_| {
                WhoisProxyError::timeout("reading WHOIS response line", config.read_timeout)
            })??;

        if read == 0 {
            // Stream ended inside a multibyte character.
            if !line.is_empty() {
                push_line(&mut text, &line);
            }
            debug!(lines_read, bytes = text.len(), "peer closed the stream");
            return Ok(QueryOutcome {
                text,
                lines_read,
                truncated: false,
            });
        }

        if line.last() != Some(&b'\n') {
            let cut = line.len() - incomplete_utf8_suffix(&line);
            carry.extend(line.drain(cut..));
        }
        push_line(&mut text, &line);

        if lines_read > config.max_loop {
            warn!(
                proxy = %tunnel.proxy(),
                max_loop = config.max_loop,
                "read loop bound reached, returning partial response"
            );
            return Ok(QueryOutcome {
                text,
                lines_read,
                truncated: true,
            });
        }
    }
}

/// Append one line plus `LINE_ENDING`, trimming whitespace and NUL padding.
fn push_line(text: &mut String, line: &[u8]) {
    let decoded = String::from_utf8_lossy(line);
    text.push_str(decoded.trim_matches(|c: char| c.is_whitespace() || c == '\0'));
    text.push_str(LINE_ENDING);
}

/// Length of a truncated UTF-8 sequence at the end of `bytes`, or 0.
fn incomplete_utf8_suffix(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let width = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if width > back { back } else { 0 };
    }
    0
}
