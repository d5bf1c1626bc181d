use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Failure subcodes raised by the callback codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    SignatureMismatch,
    BadKeyLength,
    InvalidPadding,
    RecipientMismatch,
    MalformedPayload,
}

impl CryptoError {
    pub fn code(&self) -> &'static str {
        match self {
            CryptoError::SignatureMismatch => "SIGNATURE_MISMATCH",
            CryptoError::BadKeyLength => "BAD_KEY_LENGTH",
            CryptoError::InvalidPadding => "INVALID_PADDING",
            CryptoError::RecipientMismatch => "RECIPIENT_MISMATCH",
            CryptoError::MalformedPayload => "MALFORMED_PAYLOAD",
        }
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "crypto error: {}", self.code())
    }
}

impl std::error::Error for CryptoError {}

/// Domain errors of the approval-sync engine.
///
/// Each variant carries a stable machine code so callers (and the HTTP
/// surface) can react without string matching.
#[derive(Debug)]
pub enum SyncError {
    /// Upstream rejected our credentials or a token request.
    Auth { code: i64, message: String },
    /// Upstream returned a non-zero application code other than auth.
    Api { code: i64, message: String },
    /// Rate limit (45009) survived all retry attempts.
    RateLimited { attempts: u32 },
    /// An approval detail could not be parsed or reshaped.
    Transform(String),
    /// Signature, padding, recipient, or key failure in the codec.
    Crypto(CryptoError),
    /// Disk read/write of one of the JSON stores failed.
    Store(String),
    /// Another writer currently holds the sync lock.
    LockBusy,
    /// Caller supplied an invalid or oversized time window.
    Range(String),
}

impl SyncError {
    pub fn machine_code(&self) -> &'static str {
        match self {
            SyncError::Auth { .. } => "AUTH_ERROR",
            SyncError::Api { .. } => "API_ERROR",
            SyncError::RateLimited { .. } => "RATE_LIMITED",
            SyncError::Transform(_) => "TRANSFORM_ERROR",
            SyncError::Crypto(_) => "CRYPTO_ERROR",
            SyncError::Store(_) => "STORE_ERROR",
            SyncError::LockBusy => "SYNC_IN_PROGRESS",
            SyncError::Range(_) => "RANGE_ERROR",
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Auth { code, message } => {
                write!(f, "upstream auth failed (errcode {}): {}", code, message)
            }
            SyncError::Api { code, message } => {
                write!(f, "upstream API error (errcode {}): {}", code, message)
            }
            SyncError::RateLimited { attempts } => {
                write!(f, "rate limited after {} attempts", attempts)
            }
            SyncError::Transform(msg) => write!(f, "transform failed: {}", msg),
            SyncError::Crypto(err) => write!(f, "{}", err),
            SyncError::Store(msg) => write!(f, "store failure: {}", msg),
            SyncError::LockBusy => write!(f, "sync already in progress"),
            SyncError::Range(msg) => write!(f, "invalid window: {}", msg),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<CryptoError> for SyncError {
    fn from(err: CryptoError) -> Self {
        SyncError::Crypto(err)
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Store(format!("json: {}", err))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Unauthorized(String),
    Conflict(String),
    BadRequest(String),
    TooManyRequests(String),
    ServiceUnavailable(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, code, details) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND".to_string(), None),
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                msg,
                "UNAUTHORIZED".to_string(),
                None,
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, "CONFLICT".to_string(), None),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                msg,
                "BAD_REQUEST".to_string(),
                None,
            ),
            AppError::TooManyRequests(msg) => (
                StatusCode::TOO_MANY_REQUESTS,
                msg,
                "TOO_MANY_REQUESTS".to_string(),
                None,
            ),
            AppError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                msg,
                "SERVICE_UNAVAILABLE".to_string(),
                None,
            ),
            AppError::InternalServerError(err) => {
                tracing::error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_SERVER_ERROR".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code,
            details,
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalServerError(err)
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        let code = err.machine_code();
        match err {
            SyncError::Auth { .. } => AppError::Unauthorized(format!("{} ({})", err, code)),
            SyncError::Api { .. } => AppError::ServiceUnavailable(format!("{} ({})", err, code)),
            SyncError::RateLimited { .. } => {
                AppError::TooManyRequests(format!("{} ({})", err, code))
            }
            SyncError::LockBusy => AppError::Conflict(format!("{} ({})", err, code)),
            SyncError::Range(_) => AppError::BadRequest(format!("{} ({})", err, code)),
            SyncError::Transform(_) | SyncError::Crypto(_) | SyncError::Store(_) => {
                AppError::InternalServerError(anyhow::anyhow!("{} ({})", err, code))
            }
        }
    }
}
