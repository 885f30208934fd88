//! Minimal typed HTTP/HTTPS request client
//!
//! This crate sends a single request over plain or TLS-wrapped HTTP/1.1 and
//! resolves a typed result: the response body parsed as JSON when possible,
//! the raw text otherwise. There is no pooling, no retry, no timeout, no
//! redirect following and no streaming API.
//!
//! # Example
//!
//! ```no_run
//! use serde::Deserialize;
//! use typed_request::{Decoded, Method, RequestClient};
//! use url::Url;
//!
//! #[derive(Deserialize)]
//! struct ApiResponse {
//!     message: String,
//! }
//!
//! async fn example() -> Result<(), typed_request::Error> {
//!     let mut client: RequestClient<ApiResponse> = RequestClient::new();
//!     client.set_method(Method::Post);
//!     client.set_header("authorization", "Bearer token");
//!     client.set_body(&serde_json::json!({ "query": "hello" }))?;
//!
//!     let url = Url::parse("https://api.example.com/data").expect("static URL");
//!     match client.send(&url).await? {
//!         Decoded::Json(response) => println!("{}", response.message),
//!         Decoded::Text(raw) => println!("non-JSON response: {raw}"),
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod logger;
mod method;
mod response;
mod transport;
mod wire;

pub use client::RequestClient;
pub use error::Error;
pub use logger::{Logger, TracingLogger};
pub use method::Method;
pub use response::{Decoded, HeaderValue, ResponseHeaders};
pub use transport::{
    RequestOptions, TcpTransport, TlsTransport, Transport, TransportEvent, TransportEvents,
};
