//! Bakehouse Core - Shared types and pricing rules.
//!
//! This crate provides the domain types used by the Bakehouse storefront:
//! - `storefront` - Public-facing ordering service (talks to the bakery API)
//! - `integration-tests` - End-to-end tests against a fake bakery API
//!
//! # Architecture
//!
//! The core crate contains types and pure pricing logic only - no I/O, no
//! HTTP clients, no async. Everything here is deterministic and can be unit
//! tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, emails, and status enums
//! - [`catalog`] - Products, locations, modifier groups and options
//! - [`selection`] - Modifier selection rules and the selector
//! - [`cart`] - Cart contents and line items
//! - [`totals`] - Derived cart totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod selection;
pub mod totals;
pub mod types;

pub use cart::{AppliedPromo, Cart, CartError, CartItem, LineId, MAX_LINE_QUANTITY};
pub use catalog::{
    ChosenCustomization, Location, ModifierGroup, ModifierOption, Product, SelectionType,
    customer_facing_groups,
};
pub use selection::{
    ModifierSelector, ResolvedSelection, SelectionError, SelectionState, price_delta, resolve,
};
pub use totals::{CartTotals, PricingRules};
pub use types::*;
