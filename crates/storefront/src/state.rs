//! Application state shared across handlers.

use std::sync::Arc;

use crate::bakery::{BakeryClient, BakeryError};
use crate::config::StorefrontConfig;
use crate::services::InFlightCheckouts;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the bakery API client, configuration, and in-flight checkouts.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    bakery: BakeryClient,
    checkouts: InFlightCheckouts,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the bakery API client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, BakeryError> {
        let bakery = BakeryClient::new(&config.bakery)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                bakery,
                checkouts: InFlightCheckouts::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the bakery API client.
    #[must_use]
    pub fn bakery(&self) -> &BakeryClient {
        &self.inner.bakery
    }

    /// Get the set of carts with a checkout in flight.
    #[must_use]
    pub fn checkouts(&self) -> &InFlightCheckouts {
        &self.inner.checkouts
    }
}
