use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header::CONTENT_LENGTH, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

const MAX_BUFFERED_BODY_BYTES: usize = 64 * 1024;
const MAX_LOGGED_BODY_BYTES: usize = 1024;

/// Records diagnostics whenever a handler answers 4xx/5xx. The body is
/// buffered so the same payload still reaches the caller after logging.
pub async fn log_error_responses(req: Request<Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let uri = req.uri().to_string();
    let start = Instant::now();

    let response = next.run(req).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let latency_ms = start.elapsed().as_millis() as u64;
    let (mut parts, body) = response.into_parts();
    match buffer_body(body).await {
        Ok((bytes, preview)) => {
            if status.is_server_error() {
                tracing::error!(status = status.as_u16(), method, uri, latency_ms, body = %preview, "Request failed");
            } else {
                tracing::warn!(status = status.as_u16(), method, uri, latency_ms, body = %preview, "Request rejected");
            }
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(err) => {
            parts.headers.remove(CONTENT_LENGTH);
            tracing::error!(status = status.as_u16(), method, uri, latency_ms, error = ?err, "Failed to read error response body");
            Response::from_parts(parts, Body::empty())
        }
    }
}

async fn buffer_body(body: Body) -> Result<(Bytes, String), axum::Error> {
    let bytes = to_bytes(body, MAX_BUFFERED_BODY_BYTES).await?;
    let preview = if bytes.len() > MAX_LOGGED_BODY_BYTES {
        format!(
            "{}... (truncated, {} bytes total)",
            String::from_utf8_lossy(&bytes[..MAX_LOGGED_BODY_BYTES]),
            bytes.len()
        )
    } else {
        String::from_utf8_lossy(&bytes).to_string()
    };
    Ok((bytes, preview))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn buffer_body_returns_bytes_and_preview() {
        let (bytes, preview) = buffer_body(Body::from("payload")).await.unwrap();
        assert_eq!(bytes, b"payload"[..]);
        assert_eq!(preview, "payload");
    }

    #[tokio::test]
    async fn buffer_body_truncates_large_body() {
        let large = "x".repeat(5_000);
        let (bytes, preview) = buffer_body(Body::from(large)).await.unwrap();
        assert_eq!(bytes.len(), 5_000);
        assert!(preview.contains("truncated"));
    }
}
