//! In-flight checkout tracking.
//!
//! A checkout holds a [`CheckoutGuard`] for as long as its order submission
//! runs. While the guard lives, the checkout view reports "processing"
//! instead of redirecting away from an emptied cart, and a second submission
//! for the same cart is refused.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

/// Set of cart ids with a submission in flight.
#[derive(Debug, Clone, Default)]
pub struct InFlightCheckouts {
    carts: Arc<Mutex<HashSet<Uuid>>>,
}

impl InFlightCheckouts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `cart_id` as submitting.
    ///
    /// Returns `None` if a submission for this cart is already running.
    #[must_use]
    pub fn try_begin(&self, cart_id: Uuid) -> Option<CheckoutGuard> {
        let inserted = self.lock().insert(cart_id);
        inserted.then(|| CheckoutGuard {
            owner: self.clone(),
            carts: vec![cart_id],
        })
    }

    /// Whether a submission for `cart_id` is running.
    #[must_use]
    pub fn is_in_flight(&self, cart_id: Uuid) -> bool {
        self.lock().contains(&cart_id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<Uuid>> {
        self.carts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases its cart ids when dropped.
#[derive(Debug)]
pub struct CheckoutGuard {
    owner: InFlightCheckouts,
    carts: Vec<Uuid>,
}

impl CheckoutGuard {
    /// Also cover `cart_id` until this guard is dropped.
    ///
    /// Used when a successful order rotates the cart id, so the replacement
    /// cart reads as in flight until the response is on its way.
    pub fn cover(&mut self, cart_id: Uuid) {
        if self.owner.lock().insert(cart_id) {
            self.carts.push(cart_id);
        }
    }
}

impl Drop for CheckoutGuard {
    fn drop(&mut self) {
        let mut carts = self.owner.lock();
        for id in &self.carts {
            carts.remove(id);
        }
    }
}
