//! CONNECT tunnel through an intermediate proxy.
//!
//! A `ProxyTunnel` owns one TCP connection to the proxy. After opening it the
//! caller writes a `CONNECT host:port` directive and then talks to the real
//! destination over the same byte stream.
//!
//! The proxy's reply to the CONNECT line is never read. The query is written
//! straight after the directive on the assumption that the tunnel came up,
//! and whatever acknowledgment the proxy sends ends up in the response text.

use crate::error::WhoisProxyError;
use crate::types::ClientConfig;
use std::future::Future;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;
use tracing::debug;

/// Longest line fragment returned by a single `read_line` call.
///
/// Longer lines come back in several pieces, one per call.
pub const MAX_LINE_BYTES: u64 = 1023;

/// Opens the byte stream a tunnel runs over.
///
/// `TcpConnector` is the real implementation; tests and embedders can supply
/// their own transport.
pub trait Connector {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Connect to `config.proxy_host:config.proxy_port`, bounded by `config.timeout`.
    fn connect(
        &self,
        config: &ClientConfig,
    ) -> impl Future<Output = Result<Self::Stream, WhoisProxyError>> + Send;
}

/// Plain TCP connection to the proxy.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(
        &self,
        config: &ClientConfig,
    ) -> impl Future<Output = Result<TcpStream, WhoisProxyError>> + Send {
        async move {
            let proxy = config.proxy_addr();
            let connect = TcpStream::connect((config.proxy_host.as_str(), config.proxy_port));

            match tokio::time::timeout(config.timeout, connect).await {
                Ok(Ok(stream)) => Ok(stream),
                Ok(Err(e)) => Err(WhoisProxyError::connection_from_io(proxy, &e)),
                Err(_) => Err(WhoisProxyError::connection(
                    proxy,
                    format!("connect timed out after {:?}", config.timeout),
                )),
            }
        }
    }
}

/// An open connection to the proxy, used for exactly one query.
///
/// `close` consumes the tunnel, so it can be closed at most once. Dropping an
/// unclosed tunnel still releases the socket.
pub struct ProxyTunnel<S> {
    stream: BufReader<S>,
    proxy: String,
}

impl ProxyTunnel<TcpStream> {
    /// Connect to the configured proxy over TCP.
    pub async fn open(config: &ClientConfig) -> Result<Self, WhoisProxyError> {
        Self::open_with(&TcpConnector, config).await
    }
}

impl<S> ProxyTunnel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Connect to the configured proxy through `connector`.
    pub async fn open_with<C>(connector: &C, config: &ClientConfig) -> Result<Self, WhoisProxyError>
    where
        C: Connector<Stream = S>,
    {
        let proxy = config.proxy_addr();
        debug!(%proxy, "connecting to proxy");

        let stream = connector.connect(config).await?;
        Ok(Self::from_stream(stream, proxy))
    }

    /// Wrap an already connected stream.
    pub fn from_stream<P: Into<String>>(stream: S, proxy: P) -> Self {
        Self {
            stream: BufReader::new(stream),
            proxy: proxy.into(),
        }
    }

    /// Address of the proxy this tunnel is connected to.
    pub fn proxy(&self) -> &str {
        &self.proxy
    }

    /// Write the `CONNECT host:port` directive.
    ///
    /// Does not wait for the proxy to acknowledge it.
    pub async fn request_tunnel(&mut self, host: &str, port: u16) -> Result<(), WhoisProxyError> {
        debug!(proxy = %self.proxy, destination = %format!("{}:{}", host, port), "requesting tunnel");

        let directive = format!("CONNECT {}:{}\r\n", host, port);
        self.stream.write_all(directive.as_bytes()).await?;
        Ok(())
    }

    /// Write one query line and flush it to the proxy.
    pub async fn send_query(&mut self, query: &str) -> Result<(), WhoisProxyError> {
        let line = format!("{}\r\n", query);
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read one line (at most `MAX_LINE_BYTES`) into `buf`.
    ///
    /// Returns the number of bytes read; 0 means the peer closed the stream.
    pub async fn read_line(&mut self, buf: &mut Vec<u8>) -> Result<usize, WhoisProxyError> {
        let read = (&mut self.stream)
            .take(MAX_LINE_BYTES)
            .read_until(b'\n', buf)
            .await?;
        Ok(read)
    }

    /// Shut the connection down and release it.
    pub async fn close(mut self) -> Result<(), WhoisProxyError> {
        debug!(proxy = %self.proxy, "closing tunnel");
        self.stream.shutdown().await?;
        Ok(())
    }
}
