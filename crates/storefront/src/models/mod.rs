//! Session-held models for the storefront.
//!
//! The bakery API owns every business record; the only state this service
//! keeps is per shopper, in the session:
//!
//! - the [`Cart`](bakehouse_core::Cart) (key [`session::keys::CART`])
//! - the [`CheckoutDraft`] (key [`session::keys::CHECKOUT_DRAFT`])

pub mod draft;
pub mod session;

pub use draft::CheckoutDraft;
