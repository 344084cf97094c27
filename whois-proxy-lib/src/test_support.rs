//! In-memory transports for unit tests.

use crate::error::WhoisProxyError;
use crate::protocols::tunnel::Connector;
use crate::types::ClientConfig;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

const FILLER_LINE: &[u8] = b"% still talking\n";

#[derive(Clone, Copy)]
enum Tail {
    /// Clean end of data after the scripted response
    Eof,
    /// Filler lines forever, never end of data
    Endless,
    /// Read error after the scripted response
    Fail,
}

/// Scripted stream standing in for a proxy connection.
pub(crate) struct FakeStream {
    response: Vec<u8>,
    pos: usize,
    tail: Tail,
    probe: FakeProbe,
}

/// Shared view of what a `FakeStream` saw.
#[derive(Clone, Default)]
pub(crate) struct FakeProbe {
    written: Arc<Mutex<Vec<u8>>>,
    shutdowns: Arc<AtomicUsize>,
}

impl FakeProbe {
    pub(crate) fn written(&self) -> String {
        let written = self.written.lock().unwrap();
        String::from_utf8_lossy(&written).into_owned()
    }

    pub(crate) fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl FakeStream {
    /// Serves `response` and then signals end of data.
    pub(crate) fn new(response: &[u8]) -> (Self, FakeProbe) {
        Self::build(response, Tail::Eof)
    }

    /// Serves `response` and then filler lines without ever closing.
    pub(crate) fn endless(response: &[u8]) -> (Self, FakeProbe) {
        Self::build(response, Tail::Endless)
    }

    /// Serves `response` and then fails the next read.
    pub(crate) fn failing(response: &[u8]) -> (Self, FakeProbe) {
        Self::build(response, Tail::Fail)
    }

    fn build(response: &[u8], tail: Tail) -> (Self, FakeProbe) {
        let probe = FakeProbe::default();
        let stream = Self {
            response: response.to_vec(),
            pos: 0,
            tail,
            probe: probe.clone(),
        };
        (stream, probe)
    }
}

impl AsyncRead for FakeStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.pos < self.response.len() {
            let n = buf.remaining().min(self.response.len() - self.pos);
            let start = self.pos;
            buf.put_slice(&self.response[start..start + n]);
            self.pos += n;
            return Poll::Ready(Ok(()));
        }

        match self.tail {
            Tail::Eof => Poll::Ready(Ok(())),
            Tail::Endless => {
                let offset = self.pos - self.response.len();
                let chunk: Vec<u8> = (0..buf.remaining())
                    .map(|i| FILLER_LINE[(offset + i) % FILLER_LINE.len()])
                    .collect();
                buf.put_slice(&chunk);
                self.pos += chunk.len();
                Poll::Ready(Ok(()))
            }
            Tail::Fail => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))),
        }
    }
}

impl AsyncWrite for FakeStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.probe.written.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.probe.shutdowns.fetch_add(1, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

/// Hands out a single prepared `FakeStream`.
pub(crate) struct FakeConnector {
    stream: Mutex<Option<FakeStream>>,
}

impl FakeConnector {
    pub(crate) fn new(stream: FakeStream) -> Self {
        Self {
            stream: Mutex::new(Some(stream)),
        }
    }
}

impl Connector for FakeConnector {
    type Stream = FakeStream;

    fn connect(
        &self,
        config: &ClientConfig,
    ) -> impl Future<Output = Result<FakeStream, WhoisProxyError>> + Send {
        let stream = self.stream.lock().unwrap().take();
        let proxy = config.proxy_addr();
        async move {
            stream.ok_or_else(|| WhoisProxyError::connection(proxy, "fake stream already used"))
        }
    }
}

/// Fails every connection attempt the way a closed port does.
pub(crate) struct RefusingConnector;

impl Connector for RefusingConnector {
    type Stream = FakeStream;

    fn connect(
        &self,
        config: &ClientConfig,
    ) -> impl Future<Output = Result<FakeStream, WhoisProxyError>> + Send {
        let refused = io::Error::from_raw_os_error(111);
        let err = WhoisProxyError::connection_from_io(config.proxy_addr(), &refused);
        async move { Err(err) }
    }
}
