//! Checkout route handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use super::cart::CartView;
use crate::error::Result;
use crate::models::CheckoutDraft;
use crate::models::session::{load_cart, load_draft, save_cart, save_draft};
use crate::services::{
    CheckoutContext, CheckoutError, CheckoutOutcome, PlaceOrderRequest, place_order,
};
use crate::state::AppState;

/// Checkout view.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckoutView {
    /// An order for this cart is being submitted.
    Processing,
    /// The cart can be checked out.
    Ready {
        cart: CartView,
        draft: CheckoutDraft,
    },
}

/// Show the checkout.
///
/// An empty cart redirects to `/cart`, except while an order submission for
/// it is in flight; then the view reports `processing`.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Response {
    let cart = load_cart(&session).await;

    if state.checkouts().is_in_flight(cart.id) {
        return (StatusCode::ACCEPTED, Json(CheckoutView::Processing)).into_response();
    }
    if cart.is_empty() {
        return Redirect::to("/cart").into_response();
    }

    let draft = load_draft(&session).await.unwrap_or_default();
    let cart = CartView::build(&state, cart).await;
    Json(CheckoutView::Ready { cart, draft }).into_response()
}

/// Save what the shopper has typed so far.
#[instrument(skip(session, draft))]
pub async fn save_checkout_draft(
    session: Session,
    Json(draft): Json<CheckoutDraft>,
) -> Result<Json<CheckoutDraft>> {
    let draft = draft.normalized();
    save_draft(&session, (!draft.is_blank()).then_some(&draft)).await?;
    Ok(Json(draft))
}

/// Place the order: create it, confirm payment, then clear the cart.
///
/// A second submission for the same cart while one is running gets
/// `409 Conflict`.
#[instrument(skip(state, session, request))]
pub async fn submit_order(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<CheckoutOutcome>)> {
    let cart = load_cart(&session).await;
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart.into());
    }
    let location_id = cart.location_id.ok_or(CheckoutError::NoLocation)?;

    let mut guard = state
        .checkouts()
        .try_begin(cart.id)
        .ok_or(CheckoutError::AlreadyInProgress)?;

    let location = state.bakery().get_location(location_id).await?;
    let mut ctx = CheckoutContext {
        cart,
        draft: load_draft(&session).await,
    };

    let outcome = place_order(
        state.bakery(),
        &state.config().checkout,
        &mut ctx,
        &location,
        request,
    )
    .await?;

    // Keep the emptied cart marked in flight until the session is written.
    guard.cover(ctx.cart.id);
    save_cart(&session, &ctx.cart).await?;
    save_draft(&session, ctx.draft.as_ref()).await?;
    session.save().await?;
    drop(guard);

    Ok((StatusCode::CREATED, Json(outcome)))
}
