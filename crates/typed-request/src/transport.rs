//! Transport trait and wire-level request options
//!
//! A [`Transport`] dispatches one request and exposes the response as an
//! ordered stream of events: exactly one [`TransportEvent::Head`], then zero
//! or more [`TransportEvent::Data`] chunks, then [`TransportEvent::End`]. An
//! `Err` item may appear at any point and terminates the exchange.

use std::fmt::Debug;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::Error;
use crate::method::Method;
use crate::response::ResponseHeaders;
use crate::wire;

mod tcp;
mod tls;

pub use tcp::TcpTransport;
pub use tls::TlsTransport;

/// Wire-level request options derived from a URL and the client state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    /// Host to connect to
    pub hostname: String,
    /// Port, already defaulted by scheme when the URL had none
    pub port: u16,
    /// Path plus query string, `/` when the URL had neither
    pub path: String,
    /// Request method
    pub method: Method,
    /// Request headers in insertion order
    pub headers: Vec<(String, String)>,
}

/// A single event in a response exchange
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Status and headers, always before any body data
    Head {
        /// Response status code
        status: u16,
        /// Response headers, names lowercased
        headers: ResponseHeaders,
    },
    /// One chunk of body bytes
    Data(Vec<u8>),
    /// End of the response
    End,
}

/// Stream of response events produced by a dispatched request
pub type TransportEvents = BoxStream<'static, Result<TransportEvent, Error>>;

/// HTTP transport capability
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Dispatch a request, writing `body` (if any) before ending the request,
    /// and return the response event stream.
    async fn dispatch(
        &self,
        options: RequestOptions,
        body: Option<String>,
    ) -> Result<TransportEvents, Error>;
}

/// Run one exchange over an established stream, forwarding response events
/// through a channel. Shared by the plain and TLS transports.
pub(crate) fn spawn_exchange<S>(
    stream: S,
    options: RequestOptions,
    body: Option<String>,
) -> TransportEvents
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(async move {
        if let Err(err) = exchange(stream, options, body, &tx).await {
            let _ = tx.send(Err(err)).await;
        }
    });
    Box::pin(ReceiverStream::new(rx))
}

async fn exchange<S>(
    stream: S,
    options: RequestOptions,
    body: Option<String>,
    tx: &mpsc::Sender<Result<TransportEvent, Error>>,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);

    let head = wire::request_head(&options);
    stream.get_mut().write_all(head.as_bytes()).await?;
    if let Some(body) = &body {
        stream.get_mut().write_all(body.as_bytes()).await?;
    }
    stream.get_mut().flush().await?;

    let head = read_head(&mut stream).await?;
    let framing = head.framing;
    let sent = tx
        .send(Ok(TransportEvent::Head {
            status: head.status,
            headers: head.headers,
        }))
        .await;
    if sent.is_err() {
        return Ok(());
    }

    match framing {
        wire::Framing::Length(length) => {
            copy_exact(&mut stream, length, tx).await?;
        }
        wire::Framing::Chunked => copy_chunked(&mut stream, tx).await?,
        wire::Framing::Eof => copy_to_eof(&mut stream, tx).await?,
    }

    let _ = tx.send(Ok(TransportEvent::End)).await;
    Ok(())
}

async fn read_head<S>(stream: &mut BufReader<S>) -> Result<wire::ResponseHead, Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut raw = String::new();
    loop {
        let mut line = Vec::new();
        let n = stream.read_until(b'\n', &mut line).await?;
        if n == 0 {
            return Err(Error::InvalidResponse(
                "connection closed before response head".to_string(),
            ));
        }
        if line.as_slice() == b"\r\n" || line.as_slice() == b"\n" {
            break;
        }
        raw.push_str(&String::from_utf8_lossy(&line));
    }
    wire::parse_response_head(&raw)
}

/// Forward exactly `remaining` body bytes as `Data` events, reading through a
/// bounded buffer so a peer-claimed length is never allocated up front.
/// Returns `false` when the receiver is gone and the exchange should stop.
async fn copy_exact<S>(
    stream: &mut BufReader<S>,
    mut remaining: u64,
    tx: &mpsc::Sender<Result<TransportEvent, Error>>,
) -> Result<bool, Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; 8192];
    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = stream.read(&mut buf[..want]).await?;
        if n == 0 {
            return Err(Error::Io("connection closed mid-body".to_string()));
        }
        remaining -= n as u64;
        if tx
            .send(Ok(TransportEvent::Data(buf[..n].to_vec())))
            .await
            .is_err()
        {
            return Ok(false);
        }
    }
    Ok(true)
}

async fn copy_chunked<S>(
    stream: &mut BufReader<S>,
    tx: &mpsc::Sender<Result<TransportEvent, Error>>,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let mut line = Vec::new();
        let n = stream.read_until(b'\n', &mut line).await?;
        if n == 0 {
            return Err(Error::Io("connection closed mid-body".to_string()));
        }
        let size = wire::parse_chunk_size(String::from_utf8_lossy(&line).trim())?;

        if size == 0 {
            // consume trailers up to the final blank line
            loop {
                let mut trailer = Vec::new();
                let n = stream.read_until(b'\n', &mut trailer).await?;
                if n == 0
                    || trailer.as_slice() == b"\r\n"
                    || trailer.as_slice() == b"\n"
                {
                    return Ok(());
                }
            }
        }

        // The claimed size comes from the peer; stream it through the bounded
        // buffer rather than allocating it in one piece.
        if !copy_exact(stream, size, tx).await? {
            return Ok(());
        }

        // CRLF terminating the chunk data
        let mut crlf = [0u8; 2];
        stream.read_exact(&mut crlf).await?;
    }
}

async fn copy_to_eof<S>(
    stream: &mut BufReader<S>,
    tx: &mpsc::Sender<Result<TransportEvent, Error>>,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; 8192];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        if tx
            .send(Ok(TransportEvent::Data(buf[..n].to_vec())))
            .await
            .is_err()
        {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use tokio::io::AsyncWriteExt;

    use super::*;

    fn options() -> RequestOptions {
        RequestOptions {
            hostname: "host".to_string(),
            port: 80,
            path: "/path".to_string(),
            method: Method::Get,
            headers: Vec::new(),
        }
    }

    async fn collect(mut events: TransportEvents) -> Vec<Result<TransportEvent, Error>> {
        let mut collected = Vec::new();
        while let Some(event) = events.next().await {
            collected.push(event);
        }
        collected
    }

    fn body_text(events: &[Result<TransportEvent, Error>]) -> String {
        let mut bytes = Vec::new();
        for event in events {
            if let Ok(TransportEvent::Data(chunk)) = event {
                bytes.extend_from_slice(chunk);
            }
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[tokio::test]
    async fn test_exchange_content_length_framing() {
        let (near, mut far) = tokio::io::duplex(64 * 1024);
        far.write_all(
            b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 15\r\n\r\n{\"data\": \"one\"}",
        )
        .await
        .expect("write response");

        let events = collect(spawn_exchange(near, options(), None)).await;

        assert!(matches!(
            events.first(),
            Some(Ok(TransportEvent::Head { status: 200, .. }))
        ));
        assert_eq!(body_text(&events), "{\"data\": \"one\"}");
        assert!(matches!(events.last(), Some(Ok(TransportEvent::End))));

        let mut written = Vec::new();
        far.read_to_end(&mut written).await.expect("read request");
        let written = String::from_utf8_lossy(&written).into_owned();
        assert!(written.starts_with("GET /path HTTP/1.1\r\n"));
        assert!(written.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_exchange_chunked_framing_preserves_chunks() {
        let (near, mut far) = tokio::io::duplex(64 * 1024);
        far.write_all(
            b"HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n9\r\n{\"data\": \r\n6\r\n\"one\"}\r\n0\r\n\r\n",
        )
        .await
        .expect("write response");

        let events = collect(spawn_exchange(near, options(), None)).await;

        let chunks: Vec<&[u8]> = events
            .iter()
            .filter_map(|event| match event {
                Ok(TransportEvent::Data(chunk)) => Some(chunk.as_slice()),
                _ => None,
            })
            .collect();
        assert_eq!(chunks, vec![&b"{\"data\": "[..], &b"\"one\"}"[..]]);
        assert!(matches!(events.last(), Some(Ok(TransportEvent::End))));
    }

    #[tokio::test]
    async fn test_exchange_oversized_chunk_claim_fails_without_allocating() {
        let (near, mut far) = tokio::io::duplex(64 * 1024);
        far.write_all(
            b"HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\nffffffffffffffff\r\nabc",
        )
        .await
        .expect("write response");
        far.shutdown().await.expect("close write side");

        let events = collect(spawn_exchange(near, options(), None)).await;

        assert!(matches!(
            events.first(),
            Some(Ok(TransportEvent::Head { status: 200, .. }))
        ));
        assert_eq!(body_text(&events), "abc");
        assert!(matches!(events.last(), Some(Err(Error::Io(_)))));
    }

    #[tokio::test]
    async fn test_exchange_eof_framing() {
        let (near, mut far) = tokio::io::duplex(64 * 1024);
        far.write_all(b"HTTP/1.1 200 OK\r\n\r\nHello World")
            .await
            .expect("write response");
        far.shutdown().await.expect("close write side");

        let events = collect(spawn_exchange(near, options(), None)).await;

        assert_eq!(body_text(&events), "Hello World");
        assert!(matches!(events.last(), Some(Ok(TransportEvent::End))));
    }

    #[tokio::test]
    async fn test_exchange_writes_body_after_head() {
        let (near, mut far) = tokio::io::duplex(64 * 1024);
        far.write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
            .await
            .expect("write response");

        let mut opts = options();
        opts.method = Method::Post;
        opts.headers
            .push(("content-length".to_string(), "15".to_string()));
        let events = collect(spawn_exchange(near, opts, Some("{\"test\":\"test\"}".to_string()))).await;
        assert!(matches!(events.last(), Some(Ok(TransportEvent::End))));

        let mut written = Vec::new();
        far.read_to_end(&mut written).await.expect("read request");
        let written = String::from_utf8_lossy(&written).into_owned();
        assert!(written.starts_with("POST /path HTTP/1.1\r\n"));
        assert!(written.ends_with("\r\n\r\n{\"test\":\"test\"}"));
    }

    #[tokio::test]
    async fn test_exchange_malformed_head_is_error() {
        let (near, mut far) = tokio::io::duplex(64 * 1024);
        far.write_all(b"garbage\r\n\r\n").await.expect("write response");

        let events = collect(spawn_exchange(near, options(), None)).await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events.first(), Some(Err(Error::InvalidResponse(_)))));
    }

    #[tokio::test]
    async fn test_exchange_close_mid_body_is_error() {
        let (near, mut far) = tokio::io::duplex(64 * 1024);
        far.write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\npartial")
            .await
            .expect("write response");
        far.shutdown().await.expect("close write side");

        let events = collect(spawn_exchange(near, options(), None)).await;

        assert!(matches!(
            events.first(),
            Some(Ok(TransportEvent::Head { status: 200, .. }))
        ));
        assert!(matches!(events.last(), Some(Err(Error::Io(_)))));
    }
}
