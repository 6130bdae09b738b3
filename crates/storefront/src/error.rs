//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error response is JSON: `{"message": "..."}`, plus `order_id` when a
//! payment confirmation failed for an order that already exists.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use bakehouse_core::{CartError, OrderId, SelectionError};

use crate::bakery::BakeryError;
use crate::services::CheckoutError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bakery API operation failed.
    #[error("Bakery API error: {0}")]
    Bakery(#[from] BakeryError),

    /// Modifier selection was invalid or incomplete.
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// Cart mutation was refused.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Promo or checkout operation failed.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_id: Option<OrderId>,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Bakery(err) => bakery_status(err),
            Self::Selection(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Cart(CartError::LineNotFound(_)) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Cart(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Checkout(err) => match err {
                CheckoutError::AlreadyInProgress => StatusCode::CONFLICT,
                CheckoutError::CreateOrder(e) | CheckoutError::PromoValidation(e) => {
                    bakery_status(e)
                }
                CheckoutError::ConfirmPayment { .. } => StatusCode::BAD_GATEWAY,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this is our fault or the bakery API's, not the shopper's.
    fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }

    fn client_message(&self) -> String {
        match self {
            Self::Bakery(err) => bakery_message(err, "The bakery is unavailable right now"),
            Self::Checkout(CheckoutError::CreateOrder(err)) => {
                bakery_message(err, "We could not place your order, please try again")
            }
            Self::Checkout(CheckoutError::PromoValidation(_)) => {
                "We could not check that promo code right now".to_string()
            }
            Self::Checkout(CheckoutError::ConfirmPayment { order_number, .. }) => format!(
                "Order {order_number} was created but payment could not be confirmed. \
                 Please contact the bakery quoting this order number."
            ),
            Self::Session(_) => "Internal server error".to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Selection(_) | Self::Cart(_) | Self::Checkout(_) => self.to_string(),
        }
    }
}

fn bakery_status(err: &BakeryError) -> StatusCode {
    match err {
        BakeryError::NotFound(_) => StatusCode::NOT_FOUND,
        BakeryError::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        BakeryError::Http(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn bakery_message(err: &BakeryError, fallback: &str) -> String {
    match err {
        BakeryError::NotFound(_) => "Not found".to_string(),
        _ => err
            .rejection_message()
            .map_or_else(|| fallback.to_string(), String::from),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let order_id = match &self {
            Self::Checkout(CheckoutError::ConfirmPayment { order_id, .. }) => Some(*order_id),
            _ => None,
        };

        let body = ErrorBody {
            message: self.client_message(),
            order_id,
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for shopper actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use reqwest::StatusCode as UpstreamStatus;

    use bakehouse_core::LineId;

    use super::*;

    fn session_failure(reason: &str) -> AppError {
        AppError::Session(tower_sessions::session::Error::Store(
            tower_sessions::session_store::Error::Backend(reason.to_string()),
        ))
    }

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn body_json(err: AppError) -> serde_json::Value {
        let bytes = to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("Product".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Cart(CartError::LineNotFound(LineId::new()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Cart(CartError::InvalidQuantity)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::AlreadyInProgress)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::EmptyCart)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::Bakery(BakeryError::Unauthorized)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(session_failure("store offline")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_rejection_surfaces_api_message() {
        let err = AppError::Checkout(CheckoutError::CreateOrder(BakeryError::Rejected {
            status: UpstreamStatus::UNPROCESSABLE_ENTITY,
            message: "Location is closed".to_string(),
        }));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(err).await;
        assert_eq!(body["message"], "Location is closed");
        assert!(body.get("order_id").is_none());
    }

    #[tokio::test]
    async fn test_confirm_failure_includes_order_id() {
        let err = AppError::Checkout(CheckoutError::ConfirmPayment {
            order_id: OrderId::new(42),
            order_number: "BH-0042".to_string(),
            source: BakeryError::Upstream {
                status: UpstreamStatus::INTERNAL_SERVER_ERROR,
                message: "boom".to_string(),
            },
        });
        let body = body_json(err).await;
        assert_eq!(body["order_id"], 42);
        assert!(body["message"].as_str().unwrap().contains("BH-0042"));
        assert!(!body["message"].as_str().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let body = body_json(session_failure("store password wrong")).await;
        assert_eq!(body["message"], "Internal server error");
    }
}
