//! Typed errors for the Twitter REST client.
//!
//! Failures are classified from the structured error signal the API returns
//! (HTTP status plus numeric error codes), never from human-readable text.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// API error code: the requested user does not exist.
pub const CODE_USER_NOT_FOUND: i64 = 50;
/// API error code: the requested page does not exist.
pub const CODE_PAGE_NOT_FOUND: i64 = 34;
/// API error code: the user has been suspended.
pub const CODE_USER_SUSPENDED: i64 = 63;
/// API error code: rate limit exceeded.
pub const CODE_RATE_LIMITED: i64 = 88;
/// API error code: you have been blocked by the author.
pub const CODE_BLOCKED: i64 = 136;
/// API error code: not authorized to see this status.
pub const CODE_NOT_AUTHORIZED: i64 = 179;

#[derive(Debug, Error)]
pub enum TwitterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}, codes {codes:?}): {message}")]
    Api {
        status: u16,
        codes: Vec<i64>,
        message: String,
    },

    #[error("rate limit exhausted, resets at {reset_at:?}")]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Coarse classification of a [`TwitterError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Suspended,
    Unauthorized,
    RateLimited,
    Transient,
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    errors: Vec<ApiErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEntry {
    code: i64,
    #[serde(default)]
    message: String,
}

impl TwitterError {
    /// Build an API error from a non-success response.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(parsed) if !parsed.errors.is_empty() => {
                let message = parsed
                    .errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; ");
                Self::Api {
                    status,
                    codes: parsed.errors.iter().map(|e| e.code).collect(),
                    message,
                }
            }
            _ => Self::Api {
                status,
                codes: Vec::new(),
                message: body.to_string(),
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                ErrorKind::Transient
            }
            Self::Http(_) | Self::Decode(_) => ErrorKind::Other,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Api { status, codes, .. } => classify(*status, codes),
        }
    }
}

fn classify(status: u16, codes: &[i64]) -> ErrorKind {
    // Codes are more specific than the status, so they win.
    for code in codes {
        match *code {
            CODE_USER_NOT_FOUND | CODE_PAGE_NOT_FOUND => return ErrorKind::NotFound,
            CODE_USER_SUSPENDED => return ErrorKind::Suspended,
            CODE_NOT_AUTHORIZED | CODE_BLOCKED => return ErrorKind::Unauthorized,
            CODE_RATE_LIMITED => return ErrorKind::RateLimited,
            _ => {}
        }
    }

    match status {
        401 => ErrorKind::Unauthorized,
        404 => ErrorKind::NotFound,
        429 => ErrorKind::RateLimited,
        500..=599 => ErrorKind::Transient,
        _ => ErrorKind::Other,
    }
}

pub type Result<T> = std::result::Result<T, TwitterError>;
