//! Order tracking route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use bakehouse_core::{OrderId, OrderStatus};

use crate::bakery::{BakeryError, Order};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Order confirmation view.
#[derive(Debug, Serialize)]
pub struct ConfirmationView {
    pub order: Order,
    pub headline: String,
    pub estimated_ready_at: Option<DateTime<Utc>>,
}

/// Fetch an order from the bakery API.
async fn fetch(state: &AppState, id: OrderId) -> Result<Order> {
    state.bakery().get_order(id).await.map_err(|e| match e {
        BakeryError::NotFound(_) => AppError::NotFound(format!("Order {id}")),
        other => other.into(),
    })
}

/// Current state of an order.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<OrderId>) -> Result<Json<Order>> {
    Ok(Json(fetch(&state, id).await?))
}

/// Confirmation view shown once after checkout.
#[instrument(skip(state))]
pub async fn confirmation(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<ConfirmationView>> {
    let order = fetch(&state, id).await?;

    let headline = match order.status {
        OrderStatus::Cancelled => format!("Order {} was cancelled", order.order_number),
        _ => format!("Thank you! Order {} is in", order.order_number),
    };

    Ok(Json(ConfirmationView {
        estimated_ready_at: order.estimated_ready_at,
        headline,
        order,
    }))
}
