//! Response types

use std::collections::HashMap;

use serde::de::DeserializeOwned;

/// Value of a response header: single occurrence, or every occurrence of a
/// repeated name in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// Header appeared once
    Single(String),
    /// Header appeared more than once
    Multiple(Vec<String>),
}

impl HeaderValue {
    /// First value for this header
    pub fn first(&self) -> &str {
        match self {
            HeaderValue::Single(value) => value,
            HeaderValue::Multiple(values) => values.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub(crate) fn push(&mut self, value: String) {
        match self {
            HeaderValue::Single(existing) => {
                *self = HeaderValue::Multiple(vec![std::mem::take(existing), value]);
            }
            HeaderValue::Multiple(values) => values.push(value),
        }
    }
}

/// Response headers keyed by lowercased header name
pub type ResponseHeaders = HashMap<String, HeaderValue>;

/// Result of a completed exchange: the response text parsed as JSON when
/// possible, otherwise the raw text itself
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    /// Response text parsed as JSON into `T`
    Json(T),
    /// Raw response text, used when JSON decoding fails
    Text(String),
}

impl<T> Decoded<T> {
    /// Parsed value, if the response decoded as JSON
    pub fn into_json(self) -> Option<T> {
        match self {
            Decoded::Json(value) => Some(value),
            Decoded::Text(_) => None,
        }
    }

    /// Raw text, if JSON decoding fell back
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Decoded::Json(_) => None,
            Decoded::Text(text) => Some(text),
        }
    }
}

impl<T: DeserializeOwned> Decoded<T> {
    /// Decode accumulated response text, falling back to the raw text when it
    /// is not valid JSON for `T`. Decode failure is never an error.
    pub fn decode(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => Decoded::Json(value),
            Err(_) => Decoded::Text(text),
        }
    }
}
