//! HTTP/1.1 framing
//!
//! Just enough of the wire format for a single request/response exchange:
//! request-head serialization, response-head parsing, and working out how the
//! response body is framed. Body bytes themselves are moved by the transport.

use crate::error::Error;
use crate::response::{HeaderValue, ResponseHeaders};
use crate::transport::RequestOptions;

/// How the response body is delimited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Framing {
    /// Exactly this many body bytes follow the head
    Length(u64),
    /// Body arrives as length-prefixed chunks
    Chunked,
    /// Body runs until the peer closes the connection
    Eof,
}

/// Parsed response head
#[derive(Debug)]
pub(crate) struct ResponseHead {
    pub status: u16,
    pub headers: ResponseHeaders,
    pub framing: Framing,
}

/// Serialize the request head.
///
/// Configured headers are written verbatim in insertion order. `host` and
/// `connection: close` are injected only when the caller has not set them;
/// nothing content-related is ever added.
pub(crate) fn request_head(options: &RequestOptions) -> String {
    let has_header = |name: &str| {
        options
            .headers
            .iter()
            .any(|(key, _)| key.eq_ignore_ascii_case(name))
    };

    let mut head = format!("{} {} HTTP/1.1\r\n", options.method, options.path);
    if !has_header("host") {
        if options.port == 80 || options.port == 443 {
            head.push_str(&format!("host: {}\r\n", options.hostname));
        } else {
            head.push_str(&format!("host: {}:{}\r\n", options.hostname, options.port));
        }
    }
    if !has_header("connection") {
        head.push_str("connection: close\r\n");
    }
    for (key, value) in &options.headers {
        head.push_str(&format!("{key}: {value}\r\n"));
    }
    head.push_str("\r\n");
    head
}

/// Parse everything up to and excluding the blank line that ends the head.
pub(crate) fn parse_response_head(raw: &str) -> Result<ResponseHead, Error> {
    let mut lines = raw.lines().filter(|line| !line.is_empty());

    let status_line = lines
        .next()
        .ok_or_else(|| Error::InvalidResponse("empty response head".to_string()))?;
    let status = parse_status_line(status_line)?;

    let mut headers = ResponseHeaders::new();
    for line in lines {
        let (name, value) = line.split_once(':').ok_or_else(|| {
            Error::InvalidResponse(format!("malformed header line: {line}"))
        })?;
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim().to_string();
        match headers.get_mut(&name) {
            Some(existing) => existing.push(value),
            None => {
                headers.insert(name, HeaderValue::Single(value));
            }
        }
    }

    let framing = framing_for(status, &headers)?;
    Ok(ResponseHead {
        status,
        headers,
        framing,
    })
}

fn parse_status_line(line: &str) -> Result<u16, Error> {
    let mut parts = line.split_whitespace();
    let version = parts
        .next()
        .ok_or_else(|| Error::InvalidResponse(format!("bad status line: {line}")))?;
    if !version.starts_with("HTTP/1.") {
        return Err(Error::InvalidResponse(format!("bad status line: {line}")));
    }
    parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| Error::InvalidResponse(format!("bad status line: {line}")))
}

fn framing_for(status: u16, headers: &ResponseHeaders) -> Result<Framing, Error> {
    // These statuses never carry a body, whatever the headers claim.
    if status == 204 || status == 304 || (100..200).contains(&status) {
        return Ok(Framing::Length(0));
    }

    if let Some(value) = headers.get("transfer-encoding") {
        if value
            .first()
            .split(',')
            .any(|token| token.trim().eq_ignore_ascii_case("chunked"))
        {
            return Ok(Framing::Chunked);
        }
    }

    if let Some(value) = headers.get("content-length") {
        let length = value.first().trim().parse::<u64>().map_err(|_| {
            Error::InvalidResponse(format!("bad content-length: {}", value.first()))
        })?;
        return Ok(Framing::Length(length));
    }

    Ok(Framing::Eof)
}

/// Parse a chunk-size line, ignoring chunk extensions.
pub(crate) fn parse_chunk_size(line: &str) -> Result<u64, Error> {
    let size = line.split(';').next().unwrap_or("").trim();
    u64::from_str_radix(size, 16)
        .map_err(|_| Error::InvalidResponse(format!("bad chunk size: {line}")))
}
