//! Typed request client

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::Error;
use crate::logger::{Logger, TracingLogger};
use crate::method::Method;
use crate::response::{Decoded, ResponseHeaders};
use crate::transport::{RequestOptions, TcpTransport, TlsTransport, Transport, TransportEvent};

/// Client for a single HTTP(S) request with a typed result.
///
/// Configure with the setters in any order, then [`send`](Self::send). The
/// response decodes as JSON into `T` when possible and falls back to the raw
/// text otherwise; only transport failures surface as errors. `send` takes
/// `&mut self`, so one instance can only ever have one request in flight.
pub struct RequestClient<T> {
    logger: Arc<dyn Logger>,
    plain: Arc<dyn Transport>,
    tls: Arc<dyn Transport>,
    body: Option<String>,
    method: Method,
    headers: Vec<(String, String)>,
    response_status: Option<u16>,
    response_headers: Option<ResponseHeaders>,
    marker: PhantomData<fn() -> T>,
}

/// Accumulation state of an in-flight exchange. Terminal outcomes are the
/// return value of [`RequestClient::send`]; the first terminal event wins and
/// the event stream is never polled past it.
enum ResponseState {
    Pending,
    Accumulating(Vec<u8>),
}

impl<T> fmt::Debug for RequestClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestClient")
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

impl<T> Default for RequestClient<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RequestClient<T> {
    /// Create a client with the tracing-backed logger and the production
    /// transports
    pub fn new() -> Self {
        Self::with_logger(Arc::new(TracingLogger))
    }

    /// Create a client with a custom logger
    pub fn with_logger(logger: Arc<dyn Logger>) -> Self {
        Self::with_parts(
            logger,
            Arc::new(TcpTransport),
            Arc::new(TlsTransport::default()),
        )
    }

    /// Create a client with a custom logger and transports
    pub fn with_parts(
        logger: Arc<dyn Logger>,
        plain: Arc<dyn Transport>,
        tls: Arc<dyn Transport>,
    ) -> Self {
        Self {
            logger,
            plain,
            tls,
            body: None,
            method: Method::default(),
            headers: Vec::new(),
            response_status: None,
            response_headers: None,
            marker: PhantomData,
        }
    }

    /// Set the request body. Serialized to JSON immediately; a
    /// `content-length` header is added at send time.
    pub fn set_body<B>(&mut self, body: &B) -> Result<(), Error>
    where
        B: Serialize + ?Sized,
    {
        self.body = Some(serde_json::to_string(body)?);
        Ok(())
    }

    /// Set the request method for the next send
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// Set a single request header. Last write wins for a repeated key.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(name, _)| *name == key) {
            Some((_, existing)) => *existing = value,
            None => self.headers.push((key, value)),
        }
    }

    /// Status code of the most recent response, once its head has arrived
    pub fn status_code(&self) -> Option<u16> {
        self.response_status
    }

    /// Headers of the most recent response, once its head has arrived
    pub fn response_headers(&self) -> Option<&ResponseHeaders> {
        self.response_headers.as_ref()
    }

    /// Derive wire options from the URL and current client state. The header
    /// snapshot is cloned, so mutating the client after dispatch cannot leak
    /// into an in-flight request.
    fn request_options(&self, url: &Url) -> Result<RequestOptions, Error> {
        let hostname = url
            .host_str()
            .ok_or_else(|| Error::Url(format!("no host in {url}")))?
            .to_string();

        // Port 0 in a URL counts as absent, like any other unusable port.
        let port = url
            .port()
            .filter(|port| *port > 0)
            .unwrap_or(if is_tls(url) { 443 } else { 80 });

        let mut path = url.path().to_string();
        if path.is_empty() {
            path.push('/');
        }
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        Ok(RequestOptions {
            hostname,
            port,
            path,
            method: self.method,
            headers: self.headers.clone(),
        })
    }

    fn reject(&self, url: &Url, err: Error) -> Error {
        self.logger
            .error(&format!("Request - {} {} failed - {}", self.method, url, err));
        err
    }
}

impl<T: DeserializeOwned> RequestClient<T> {
    /// Send the request.
    ///
    /// Resolves with the decoded response once the transport reports the end
    /// of the response, or fails with the first transport error. A transport
    /// that never produces an event leaves the future pending.
    pub async fn send(&mut self, url: &Url) -> Result<Decoded<T>, Error> {
        if let Some(length) = self.body.as_ref().map(String::len) {
            self.set_header("content-length", length.to_string());
        }

        let options = self.request_options(url)?;
        let transport = if is_tls(url) {
            Arc::clone(&self.tls)
        } else {
            Arc::clone(&self.plain)
        };

        self.logger.debug(
            "Request",
            &format!("Starting request - {} {}", self.method, url),
        );

        let body = self.body.clone();
        if let Some(body) = &body {
            self.logger.debug(
                "Request",
                &format!("Sending request body - {} {} - {}", self.method, url, body),
            );
        }

        let mut events = match transport.dispatch(options, body).await {
            Ok(events) => events,
            Err(err) => return Err(self.reject(url, err)),
        };

        let mut state = ResponseState::Pending;
        while let Some(event) = events.next().await {
            match event {
                Ok(TransportEvent::Head { status, headers }) => {
                    self.response_status = Some(status);
                    self.response_headers = Some(headers);
                    state = ResponseState::Accumulating(Vec::new());
                }
                Ok(TransportEvent::Data(chunk)) => {
                    if let ResponseState::Accumulating(buffer) = &mut state {
                        buffer.extend_from_slice(&chunk);
                    }
                }
                Ok(TransportEvent::End) => {
                    self.logger.debug(
                        "Request",
                        &format!("Request complete - {} {}", self.method, url),
                    );
                    let text = match state {
                        ResponseState::Accumulating(buffer) => {
                            String::from_utf8_lossy(&buffer).into_owned()
                        }
                        ResponseState::Pending => String::new(),
                    };
                    return Ok(Decoded::decode(text));
                }
                Err(err) => return Err(self.reject(url, err)),
            }
        }

        Err(self.reject(
            url,
            Error::Io("transport closed without completing the response".to_string()),
        ))
    }
}

fn is_tls(url: &Url) -> bool {
    url.scheme() == "https"
}
