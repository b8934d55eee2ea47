//! reqwest-backed [`Transport`].

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use tracing::{debug, warn};

use crate::error::{Result, StreamError, TimeoutKind};
use crate::transport::{ByteStream, Transport, TransportRequest};

/// Retry hint used when a 429 carries none.
const DEFAULT_RETRY_AFTER_MS: u64 = 1000;

/// HTTP transport over a shared [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a caller-built client (proxies, custom TLS).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn send(&self, request: &TransportRequest, accept: &str) -> Result<reqwest::Response> {
        let mut req = self
            .http
            .post(&request.url)
            .header("Authorization", format!("Bearer {}", request.api_key.expose()))
            .header("Content-Type", "application/json")
            .header("Accept", accept)
            .header("Cache-Control", "no-cache");
        for (k, v) in &request.headers {
            req = req.header(k.as_str(), v.as_str());
        }

        let response = match tokio::time::timeout(request.timeout, req.json(&request.body).send()).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(classify_reqwest_error(&e)),
            Err(_) => return Err(StreamError::Timeout(TimeoutKind::Connect)),
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        let err = classify_status(status, &headers, &body);
        warn!(
            provider = %request.provider,
            status = status.as_u16(),
            error = %err,
            "provider rejected request"
        );
        Err(err)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn open(&self, request: &TransportRequest) -> Result<ByteStream> {
        debug!(
            provider = %request.provider,
            model = %request.body.model,
            messages = request.body.messages.len(),
            "opening stream"
        );
        let response = self.send(request, "text/event-stream").await?;
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| StreamError::Network(format!("stream read error: {e}"))));
        Ok(Box::pin(stream))
    }

    async fn probe(&self, request: &TransportRequest) -> Result<()> {
        debug!(provider = %request.provider, "probing provider");
        self.send(request, "application/json").await.map(|_| ())
    }
}

/// Map a non-success status to the error taxonomy.
pub fn classify_status(status: StatusCode, headers: &HeaderMap, body: &str) -> StreamError {
    match status.as_u16() {
        401 | 403 => StreamError::Auth {
            status: status.as_u16(),
            message: extract_error_message(body).unwrap_or_else(|| body.to_owned()),
        },
        429 => StreamError::RateLimited {
            retry_after_ms: parse_retry_after_header(headers)
                .or_else(|| parse_retry_after_ms(body))
                .unwrap_or(DEFAULT_RETRY_AFTER_MS),
        },
        code if status.is_server_error() => StreamError::Server {
            status: code,
            body: body.to_owned(),
        },
        code => StreamError::Client {
            status: code,
            body: body.to_owned(),
        },
    }
}

fn classify_reqwest_error(err: &reqwest::Error) -> StreamError {
    if err.is_timeout() {
        StreamError::Timeout(TimeoutKind::Connect)
    } else {
        StreamError::Network(err.to_string())
    }
}

/// Pull `error.message` out of an OpenAI-style error body.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|e| e.get("message").or(Some(e)))
        .and_then(|m| m.as_str())
        .map(str::to_owned)
}

/// Numeric `Retry-After` (seconds, possibly fractional).
fn parse_retry_after_header(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get("retry-after")?.to_str().ok()?;
    let secs = value.trim().parse::<f64>().ok()?;
    Some((secs * 1000.0).max(0.0) as u64)
}

/// `retry_after_ms` or `retry_after` (seconds) in a JSON error body.
fn parse_retry_after_ms(body: &str) -> Option<u64> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("retry_after_ms")
        .and_then(|v| v.as_u64())
        .or_else(|| {
            value
                .get("retry_after")
                .and_then(|v| v.as_f64())
                .map(|secs| (secs * 1000.0) as u64)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn no_headers() -> HeaderMap {
        HeaderMap::new()
    }

    #[test]
    fn classify_auth() {
        let err = classify_status(
            StatusCode::UNAUTHORIZED,
            &no_headers(),
            r#"{"error":{"message":"bad key"}}"#,
        );
        match err {
            StreamError::Auth { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "bad key");
            }
            other => panic!("expected Auth, got {other:?}"),
        }
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, &no_headers(), "nope"),
            StreamError::Auth { status: 403, .. }
        ));
    }

    #[test]
    fn classify_rate_limit_prefers_header() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("2.5"));
        let err = classify_status(
            StatusCode::TOO_MANY_REQUESTS,
            &headers,
            r#"{"retry_after_ms": 100}"#,
        );
        assert!(matches!(err, StreamError::RateLimited { retry_after_ms: 2500 }));
    }

    #[test]
    fn classify_rate_limit_from_body_or_default() {
        let err = classify_status(StatusCode::TOO_MANY_REQUESTS, &no_headers(), r#"{"retry_after": 3}"#);
        assert!(matches!(err, StreamError::RateLimited { retry_after_ms: 3000 }));

        let err = classify_status(StatusCode::TOO_MANY_REQUESTS, &no_headers(), "slow down");
        assert!(matches!(err, StreamError::RateLimited { retry_after_ms: 1000 }));
    }

    #[test]
    fn classify_server_and_client() {
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, &no_headers(), "upstream"),
            StreamError::Server { status: 502, .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, &no_headers(), "no model"),
            StreamError::Client { status: 404, .. }
        ));
    }

    #[test]
    fn extract_error_message_shapes() {
        assert_eq!(
            extract_error_message(r#"{"error":{"message":"m"}}"#).as_deref(),
            Some("m")
        );
        assert_eq!(extract_error_message(r#"{"error":"flat"}"#).as_deref(), Some("flat"));
        assert!(extract_error_message("not json").is_none());
    }
}
