//! Shared HTTP client, SSE parsing, and auth utilities.

use std::sync::OnceLock;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::AgentError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
///
/// No overall request timeout: completions stream for as long as the model
/// talks, and deadlines are a caller concern.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    })
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Raw response bytes split into lines.
///
/// Bytes are decoded only once a whole line has arrived, so a multi-byte
/// character split across network reads comes through intact.
#[derive(Debug, Default)]
pub struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// Next complete line, trimmed, without its terminator.
    pub fn next_line(&mut self) -> Option<String> {
        let end = self.bytes.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.bytes.drain(..=end).collect();
        Some(String::from_utf8_lossy(&line[..end]).trim().to_string())
    }
}

/// One parsed SSE data line.
#[derive(Debug, PartialEq, Eq)]
pub enum SseData<'a> {
    Payload(&'a str),
    Done,
}

/// Parse an SSE line. Returns `None` for comments, blank lines and fields
/// other than `data`.
pub fn parse_sse_data(line: &str) -> Option<SseData<'_>> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        return Some(SseData::Done);
    }
    Some(SseData::Payload(data))
}

/// Map a non-success HTTP status to an error.
pub fn status_to_error(status: u16, body: &str) -> AgentError {
    match status {
        401 | 403 => AgentError::Authentication(body.to_string()),
        429 => AgentError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => AgentError::api(status, body),
    }
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_multibyte_character_survives_line_buffering() {
        let line = "data: {\"content\":\"héllo\"}\n".as_bytes();
        let split = line.iter().position(|b| *b == 0xC3).expect("é lead byte") + 1;
        let mut buffer = LineBuffer::new();
        buffer.push(&line[..split]);
        assert_eq!(buffer.next_line(), None);
        buffer.push(&line[split..]);
        assert_eq!(
            buffer.next_line().as_deref(),
            Some("data: {\"content\":\"héllo\"}")
        );
        assert_eq!(buffer.next_line(), None);
    }

    #[test]
    fn line_buffer_yields_lines_in_order_and_keeps_the_tail() {
        let mut buffer = LineBuffer::new();
        buffer.push(b"data: a\r\n\ndata: b\ndata: ");
        assert_eq!(buffer.next_line().as_deref(), Some("data: a"));
        assert_eq!(buffer.next_line().as_deref(), Some(""));
        assert_eq!(buffer.next_line().as_deref(), Some("data: b"));
        assert_eq!(buffer.next_line(), None);
        buffer.push(b"[DONE]\n");
        assert_eq!(buffer.next_line().as_deref(), Some("data: [DONE]"));
    }

    #[test]
    fn parses_data_lines_and_done_sentinel() {
        assert_eq!(parse_sse_data("data: {\"a\":1}"), Some(SseData::Payload("{\"a\":1}")));
        assert_eq!(parse_sse_data("data:{}"), Some(SseData::Payload("{}")));
        assert_eq!(parse_sse_data("data: [DONE]"), Some(SseData::Done));
        assert_eq!(parse_sse_data("event: ping"), None);
    }

    #[test]
    fn rate_limit_reads_retry_hint() {
        let err = status_to_error(429, r#"{"error":{"retry_after":1.5}}"#);
        assert!(matches!(
            err,
            AgentError::RateLimited {
                retry_after_ms: Some(1500)
            }
        ));
    }

    #[test]
    fn auth_statuses_map_to_authentication() {
        assert!(matches!(status_to_error(401, "no"), AgentError::Authentication(_)));
        assert!(matches!(status_to_error(500, "boom"), AgentError::Api { status: 500, .. }));
    }
}
