//! Business logic services for storefront.
//!
//! # Services
//!
//! - `checkout` - Promo codes and the create-then-confirm order sequence
//! - `gateway` - The bakery API calls checkout depends on
//! - `guard` - In-flight checkout tracking per cart

pub mod checkout;
pub mod gateway;
pub mod guard;

pub use checkout::{
    CheckoutContext, CheckoutError, CheckoutOutcome, PaymentDetails, PlaceOrderRequest,
    apply_promo, confirmation_path, place_order,
};
pub use gateway::OrderGateway;
pub use guard::{CheckoutGuard, InFlightCheckouts};
