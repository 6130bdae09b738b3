//! Cart route handlers.
//!
//! The cart lives in the session. Every handler loads it, applies one change,
//! stores it back and responds with the recomputed [`CartView`].
//!
//! While an order for the cart is being placed, changes get `409 Conflict`:
//! the checkout writes the emptied cart over whatever they would store.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use bakehouse_core::{
    Cart, CartItem, CartTotals, FulfillmentMethod, LineId, Location, LocationId, ProductId,
    resolve,
};

use super::products::{Selections, customer_groups};
use crate::error::{Result, add_breadcrumb};
use crate::models::session::{load_cart, save_cart};
use crate::services::{CheckoutError, apply_promo};
use crate::state::AppState;

/// Cart with its derived totals.
#[derive(Debug, Serialize)]
pub struct CartView {
    #[serde(flatten)]
    pub cart: Cart,
    pub item_count: u32,
    pub totals: CartTotals,
    pub location: Option<Location>,
}

impl CartView {
    /// Build the view, fetching the cart's location for pricing.
    ///
    /// If the location cannot be fetched, totals are computed without it.
    pub async fn build(state: &AppState, cart: Cart) -> Self {
        let location = cart_location(state, &cart).await;
        let totals = CartTotals::compute(
            &cart,
            location.as_deref(),
            &state.config().checkout.pricing,
        );

        Self {
            item_count: cart.item_count(),
            totals,
            location: location.map(|l| Location::clone(&l)),
            cart,
        }
    }
}

async fn cart_location(state: &AppState, cart: &Cart) -> Option<Arc<Location>> {
    let id = cart.location_id?;
    match state.bakery().get_location(id).await {
        Ok(location) => Some(location),
        Err(e) => {
            tracing::warn!(location_id = %id, error = %e, "Failed to load cart location");
            None
        }
    }
}

/// Save the cart and respond with its view.
async fn respond(state: &AppState, session: &Session, cart: Cart) -> Result<Json<CartView>> {
    save_cart(session, &cart).await?;
    Ok(Json(CartView::build(state, cart).await))
}

/// Load the cart for a change, refusing while an order for it is being placed.
async fn editable_cart(state: &AppState, session: &Session) -> Result<Cart> {
    let cart = load_cart(session).await;
    if state.checkouts().is_in_flight(cart.id) {
        return Err(CheckoutError::AlreadyInProgress.into());
    }
    Ok(cart)
}

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub selections: Selections,
}

const fn default_quantity() -> u32 {
    1
}

/// Update quantity request body.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

/// Location and fulfillment request body.
#[derive(Debug, Deserialize)]
pub struct SetLocationRequest {
    pub location_id: LocationId,
    #[serde(default)]
    pub fulfillment: FulfillmentMethod,
}

/// Loyalty redemption request body.
#[derive(Debug, Deserialize)]
pub struct SetLoyaltyRequest {
    pub points: u32,
}

/// Promo code request body.
#[derive(Debug, Deserialize)]
pub struct ApplyPromoRequest {
    pub code: String,
}

/// Show the cart.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Json<CartView> {
    let cart = load_cart(&session).await;
    Json(CartView::build(&state, cart).await)
}

/// Add a product with its modifier selections.
#[instrument(skip(state, session))]
pub async fn add_item(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartView>)> {
    let product = state.bakery().get_product(request.product_id).await?;
    let groups = customer_groups(&state, request.product_id).await;

    let resolved = resolve(&groups, &request.selections)?;
    resolved.ensure_complete()?;

    let item = CartItem::new(&product, request.quantity, resolved.customizations)?;
    let mut cart = editable_cart(&state, &session).await?;
    let line_id = cart.add_item(item)?;

    let product_id = product.id.to_string();
    let line = line_id.to_string();
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", product_id.as_str()), ("line_id", line.as_str())]),
    );

    let view = respond(&state, &session, cart).await?;
    Ok((StatusCode::CREATED, view))
}

/// Change a line's quantity; zero removes it.
#[instrument(skip(state, session))]
pub async fn update_item(
    State(state): State<AppState>,
    session: Session,
    Path(line_id): Path<LineId>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    let mut cart = editable_cart(&state, &session).await?;
    cart.set_quantity(line_id, request.quantity)?;
    respond(&state, &session, cart).await
}

/// Remove a line.
#[instrument(skip(state, session))]
pub async fn remove_item(
    State(state): State<AppState>,
    session: Session,
    Path(line_id): Path<LineId>,
) -> Result<Json<CartView>> {
    let mut cart = editable_cart(&state, &session).await?;
    cart.remove_item(line_id)?;
    respond(&state, &session, cart).await
}

/// Choose the location and fulfillment method.
#[instrument(skip(state, session))]
pub async fn set_location(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<SetLocationRequest>,
) -> Result<Json<CartView>> {
    let location = state.bakery().get_location(request.location_id).await?;
    if !location.supports(request.fulfillment) {
        return Err(CheckoutError::FulfillmentUnavailable {
            location: location.name.clone(),
            method: request.fulfillment,
        }
        .into());
    }

    let mut cart = editable_cart(&state, &session).await?;
    cart.location_id = Some(location.id);
    cart.fulfillment = request.fulfillment;
    respond(&state, &session, cart).await
}

/// Set how many loyalty points to redeem; zero clears the redemption.
#[instrument(skip(state, session))]
pub async fn set_loyalty(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<SetLoyaltyRequest>,
) -> Result<Json<CartView>> {
    let mut cart = editable_cart(&state, &session).await?;
    cart.loyalty_points = request.points;
    respond(&state, &session, cart).await
}

/// Validate and apply a promo code.
#[instrument(skip(state, session, request))]
pub async fn apply_promo_code(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<ApplyPromoRequest>,
) -> Result<Json<CartView>> {
    let mut cart = editable_cart(&state, &session).await?;
    apply_promo(state.bakery(), &mut cart, &request.code).await?;
    respond(&state, &session, cart).await
}

/// Remove the applied promo code.
#[instrument(skip(state, session))]
pub async fn remove_promo(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CartView>> {
    let mut cart = editable_cart(&state, &session).await?;
    cart.promo = None;
    respond(&state, &session, cart).await
}
