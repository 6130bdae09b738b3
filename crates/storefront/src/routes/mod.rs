//! HTTP route handlers for storefront.
//!
//! Every route speaks JSON. Error bodies are `{"message": "..."}`.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (bakery API reachable)
//!
//! # Catalog
//! GET  /products               - Product listing (?category_id=, ?available_only=)
//! GET  /products/{id}          - Product detail
//! GET  /products/{id}/modifiers         - Available modifier groups and options
//! POST /products/{id}/modifiers/preview - Price a selection without adding it
//! GET  /locations              - Locations
//!
//! # Cart (session)
//! GET    /cart                 - Cart with totals
//! POST   /cart/items           - Add item with modifier selections
//! PATCH  /cart/items/{line_id} - Update quantity (0 removes)
//! DELETE /cart/items/{line_id} - Remove line
//! PUT    /cart/location        - Choose location and fulfillment method
//! PUT    /cart/loyalty         - Loyalty points to redeem (0 clears)
//! POST   /cart/promo           - Apply promo code (rate limited)
//! DELETE /cart/promo           - Remove promo code
//!
//! # Checkout
//! GET  /checkout               - Checkout view (redirects to /cart when empty)
//! PUT  /checkout/draft         - Save checkout form
//! POST /checkout/orders        - Place order
//!
//! # Orders
//! GET  /orders/{id}            - Order tracking
//! GET  /orders/{id}/confirmation - Confirmation view
//! ```

pub mod cart;
pub mod checkout;
pub mod locations;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::middleware::promo_rate_limiter;
use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route("/{id}/modifiers", get(products::modifiers))
        .route("/{id}/modifiers/preview", post(products::preview))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    let promo = Router::new()
        .route("/", post(cart::apply_promo_code))
        .route_layer(promo_rate_limiter())
        .route("/", axum::routing::delete(cart::remove_promo));

    Router::new()
        .route("/", get(cart::show))
        .route("/items", post(cart::add_item))
        .route(
            "/items/{line_id}",
            axum::routing::patch(cart::update_item).delete(cart::remove_item),
        )
        .route("/location", put(cart::set_location))
        .route("/loyalty", put(cart::set_loyalty))
        .nest("/promo", promo)
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/draft", put(checkout::save_checkout_draft))
        .route("/orders", post(checkout::submit_order))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(orders::show))
        .route("/{id}/confirmation", get(orders::confirmation))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .route("/locations", get(locations::index))
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/orders", order_routes())
}
