use super::request::HeaderVec;
use std::sync::Arc;

pub(crate) fn status_reason(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

/// The encoded response a pipeline hands back to the server adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    pub headers: HeaderVec,
    /// Serialized body; empty when the resolved response had no body
    pub body: Vec<u8>,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// A response with no headers and no body.
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self::new(status, HeaderVec::new(), Vec::new())
    }

    /// A `{"error": message}` JSON response, used where no negotiated encoder exists
    /// (router misses, middleware rejections).
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        let mut res = Self::empty(status);
        res.set_header("content-type", "application/json".to_string());
        res.body = serde_json::json!({ "error": message }).to_string().into_bytes();
        res
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Reason phrase for the status line.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        status_reason(self.status)
    }

    /// Parse the body as JSON; `None` for an empty or non-JSON body.
    #[must_use]
    pub fn json_body(&self) -> Option<serde_json::Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }
}
