//! The upstream-facing callback endpoint.
//!
//! GET is the URL-verification handshake; POST delivers encrypted
//! approval events. POST answers the literal body `success` no matter
//! what, so the upstream never retries an event we chose to drop.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub msg_signature: String,
    pub timestamp: String,
    pub nonce: String,
    pub echostr: String,
}

pub async fn verify_url(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    let Some(processor) = state.callbacks.as_ref() else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    match processor.verify_url(
        &query.msg_signature,
        &query.timestamp,
        &query.nonce,
        &query.echostr,
    ) {
        Ok(plaintext) => plaintext.into_response(),
        Err(err) => {
            // Deliberately opaque: the caller learns nothing about which
            // check failed.
            tracing::warn!(%err, "Callback URL verification failed");
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EventQuery {
    pub msg_signature: String,
    pub timestamp: String,
    pub nonce: String,
}

pub async fn receive_event(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
    body: String,
) -> &'static str {
    if let Some(processor) = state.callbacks.as_ref() {
        processor
            .handle_event(&query.msg_signature, &query.timestamp, &query.nonce, &body)
            .await;
    } else {
        tracing::warn!("Callback event received but credentials are not configured");
    }

    "success"
}
