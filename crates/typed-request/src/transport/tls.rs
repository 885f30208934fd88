//! Encrypted transport

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::error::Error;
use crate::transport::{spawn_exchange, RequestOptions, Transport, TransportEvents};

/// Transport for `https` URLs: rustls over TCP, webpki roots, SNI from the
/// request hostname
#[derive(Clone)]
pub struct TlsTransport {
    config: Arc<ClientConfig>,
}

impl fmt::Debug for TlsTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TlsTransport")
    }
}

impl Default for TlsTransport {
    fn default() -> Self {
        if rustls::crypto::CryptoProvider::get_default().is_none() {
            let _ = rustls::crypto::ring::default_provider().install_default();
        }

        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();

        Self {
            config: Arc::new(config),
        }
    }
}

#[async_trait]
impl Transport for TlsTransport {
    async fn dispatch(
        &self,
        options: RequestOptions,
        body: Option<String>,
    ) -> Result<TransportEvents, Error> {
        let server_name = ServerName::try_from(options.hostname.clone())
            .map_err(|err| Error::Tls(err.to_string()))?;

        let tcp = TcpStream::connect((options.hostname.as_str(), options.port))
            .await
            .map_err(|err| Error::Connection(err.to_string()))?;

        let connector = TlsConnector::from(Arc::clone(&self.config));
        let stream = connector
            .connect(server_name, tcp)
            .await
            .map_err(|err| Error::Tls(err.to_string()))?;

        Ok(spawn_exchange(stream, options, body))
    }
}
