//! Bakery REST API client.
//!
//! # Architecture
//!
//! - Plain JSON over HTTPS with a bearer token on every request
//! - The bakery API is the source of truth - NO local persistence
//! - In-memory caching via `moka` for catalog reads (5 minute TTL)
//! - Orders, payments and promo validation are never cached
//!
//! # Example
//!
//! ```rust,ignore
//! use bakehouse_storefront::bakery::BakeryClient;
//!
//! let client = BakeryClient::new(&config.bakery)?;
//!
//! let groups = client.modifier_groups(product_id).await?;
//! let order = client.create_order(&request).await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::BakeryClient;
pub use types::*;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the bakery API.
#[derive(Debug, Error)]
pub enum BakeryError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Could not build a request URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The API token was refused.
    #[error("Bakery API rejected credentials")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API refused the request for a business or validation reason.
    #[error("Rejected ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    /// The API failed on its side.
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: StatusCode, message: String },
}

impl BakeryError {
    /// Message safe to show a shopper, when the API supplied one.
    #[must_use]
    pub fn rejection_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Classify a non-success response.
    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        let message = extract_message(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unexpected response")
                .to_string()
        });

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized,
            StatusCode::NOT_FOUND => Self::NotFound(message),
            s if s.is_client_error() => Self::Rejected { status, message },
            _ => Self::Upstream { status, message },
        }
    }
}

/// Read the optional `message` field off an error body.
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
}
