//! Session-related types and helpers.
//!
//! Reads treat a missing or undecodable value as absent so that a stale
//! session never blocks a shopper; writes propagate store errors.

use tower_sessions::Session;

use bakehouse_core::Cart;

use super::CheckoutDraft;

/// Session keys for storefront data.
pub mod keys {
    /// Key for the shopper's cart.
    pub const CART: &str = "cart";

    /// Key for the saved checkout form.
    pub const CHECKOUT_DRAFT: &str = "checkout_draft";
}

/// Load the cart from the session, or a fresh empty cart.
pub async fn load_cart(session: &Session) -> Cart {
    match session.get::<Cart>(keys::CART).await {
        Ok(Some(cart)) => cart,
        Ok(None) => Cart::new(),
        Err(e) => {
            tracing::warn!(error = %e, "Discarding unreadable cart from session");
            Cart::new()
        }
    }
}

/// Store the cart in the session.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_cart(
    session: &Session,
    cart: &Cart,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CART, cart).await
}

/// Load the checkout draft, if one was saved.
pub async fn load_draft(session: &Session) -> Option<CheckoutDraft> {
    session
        .get::<CheckoutDraft>(keys::CHECKOUT_DRAFT)
        .await
        .ok()
        .flatten()
}

/// Store or clear the checkout draft.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_draft(
    session: &Session,
    draft: Option<&CheckoutDraft>,
) -> Result<(), tower_sessions::session::Error> {
    match draft {
        Some(draft) => session.insert(keys::CHECKOUT_DRAFT, draft).await,
        None => session
            .remove::<CheckoutDraft>(keys::CHECKOUT_DRAFT)
            .await
            .map(|_| ()),
    }
}
