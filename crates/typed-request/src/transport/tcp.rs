//! Plain transport

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::error::Error;
use crate::transport::{spawn_exchange, RequestOptions, Transport, TransportEvents};

/// Transport for `http` URLs, speaking HTTP/1.1 over a TCP stream
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpTransport;

#[async_trait]
impl Transport for TcpTransport {
    async fn dispatch(
        &self,
        options: RequestOptions,
        body: Option<String>,
    ) -> Result<TransportEvents, Error> {
        let stream = TcpStream::connect((options.hostname.as_str(), options.port))
            .await
            .map_err(|err| Error::Connection(err.to_string()))?;
        Ok(spawn_exchange(stream, options, body))
    }
}
