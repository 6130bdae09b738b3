//! Cart contents.
//!
//! A [`Cart`] is plain data: it is serialized into the shopper's session and
//! never sent to the bakery API as-is. Totals are derived on demand by
//! [`crate::CartTotals::compute`].

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::{ChosenCustomization, Product};
use crate::selection::price_delta;
use crate::types::{FulfillmentMethod, LocationId, ProductId, round_money};

/// Largest quantity allowed on one cart line.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Errors from cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("quantity must be between 1 and {MAX_LINE_QUANTITY}")]
    InvalidQuantity,

    #[error("cart line {0} not found")]
    LineNotFound(LineId),

    #[error("{0} is not available right now")]
    ProductUnavailable(String),
}

/// Identifier of one cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(Uuid);

impl LineId {
    /// Generate a fresh line id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::str::FromStr for LineId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// =============================================================================
// CartItem
// =============================================================================

/// One product line with its chosen customizations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub line_id: LineId,
    pub product_id: ProductId,
    pub product_name: String,
    /// Product base price at the time it was added.
    pub unit_price: Decimal,
    pub quantity: u32,
    pub customizations: Vec<ChosenCustomization>,
}

impl CartItem {
    /// Build a line for `product`.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is unavailable or the quantity is out
    /// of range.
    pub fn new(
        product: &Product,
        quantity: u32,
        customizations: Vec<ChosenCustomization>,
    ) -> Result<Self, CartError> {
        if !product.is_available {
            return Err(CartError::ProductUnavailable(product.name.clone()));
        }
        validate_quantity(quantity)?;

        Ok(Self {
            line_id: LineId::new(),
            product_id: product.id,
            product_name: product.name.clone(),
            unit_price: product.base_price,
            quantity,
            customizations,
        })
    }

    /// Price of one unit including customizations, never below zero.
    #[must_use]
    pub fn unit_total(&self) -> Decimal {
        (self.unit_price + price_delta(&self.customizations)).max(Decimal::ZERO)
    }

    /// Line total: unit total times quantity, rounded to cents.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        round_money(self.unit_total() * Decimal::from(self.quantity))
    }

    fn same_configuration(&self, other: &Self) -> bool {
        self.product_id == other.product_id
            && self.unit_price == other.unit_price
            && self.customizations == other.customizations
    }
}

fn validate_quantity(quantity: u32) -> Result<(), CartError> {
    if (1..=MAX_LINE_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        Err(CartError::InvalidQuantity)
    }
}

// =============================================================================
// Promo
// =============================================================================

/// A promo code accepted by the bakery API, with the discount it computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedPromo {
    pub code: String,
    pub discount_amount: Decimal,
}

impl AppliedPromo {
    /// Normalize a shopper-entered code: trimmed and upper-cased.
    ///
    /// Returns `None` for blank input.
    #[must_use]
    pub fn normalize_code(raw: &str) -> Option<String> {
        let code = raw.trim();
        (!code.is_empty()).then(|| code.to_uppercase())
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopper's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub location_id: Option<LocationId>,
    pub fulfillment: FulfillmentMethod,
    pub items: Vec<CartItem>,
    pub promo: Option<AppliedPromo>,
    pub loyalty_points: u32,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl Cart {
    /// Create an empty cart with a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            location_id: None,
            fulfillment: FulfillmentMethod::default(),
            items: Vec::new(),
            promo: None,
            loyalty_points: 0,
        }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Sum of line subtotals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::subtotal).sum()
    }

    /// Add a line, merging it into an identical existing line.
    ///
    /// Returns the id of the line that now holds the item.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] if merging would exceed the
    /// per-line maximum.
    pub fn add_item(&mut self, item: CartItem) -> Result<LineId, CartError> {
        if let Some(existing) = self.items.iter_mut().find(|i| i.same_configuration(&item)) {
            let quantity = existing.quantity.saturating_add(item.quantity);
            validate_quantity(quantity)?;
            existing.quantity = quantity;
            return Ok(existing.line_id);
        }

        validate_quantity(item.quantity)?;
        let line_id = item.line_id;
        self.items.push(item);
        Ok(line_id)
    }

    /// Change a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line does not exist or the quantity is too
    /// large.
    pub fn set_quantity(&mut self, line_id: LineId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove_item(line_id);
        }
        validate_quantity(quantity)?;

        let line = self
            .items
            .iter_mut()
            .find(|i| i.line_id == line_id)
            .ok_or(CartError::LineNotFound(line_id))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the line does not exist.
    pub fn remove_item(&mut self, line_id: LineId) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.line_id != line_id);
        if self.items.len() == before {
            return Err(CartError::LineNotFound(line_id));
        }
        Ok(())
    }

    /// Empty the cart after a successful order.
    ///
    /// Items, promo and loyalty redemption are dropped and the cart gets a new
    /// id; the chosen location and fulfillment method are kept.
    pub fn clear(&mut self) {
        *self = Self {
            location_id: self.location_id,
            fulfillment: self.fulfillment,
            ..Self::new()
        };
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{ModifierGroupId, ModifierOptionId};

    fn croissant() -> Product {
        Product {
            id: ProductId::new(1),
            name: "Croissant".to_string(),
            description: None,
            base_price: Decimal::new(250, 2),
            category_id: None,
            image_url: None,
            is_available: true,
        }
    }

    fn jam(price_cents: i64) -> ChosenCustomization {
        ChosenCustomization {
            group_id: ModifierGroupId::new(1),
            group_name: "Filling".to_string(),
            option_id: ModifierOptionId::new(3),
            option_name: "Jam".to_string(),
            price_adjustment: Decimal::new(price_cents, 2),
        }
    }

    #[test]
    fn test_item_subtotal_includes_customizations() {
        let item = CartItem::new(&croissant(), 3, vec![jam(50)]).unwrap();
        assert_eq!(item.unit_total(), Decimal::new(300, 2));
        assert_eq!(item.subtotal(), Decimal::new(900, 2));
    }

    #[test]
    fn test_unit_total_never_goes_below_zero() {
        let item = CartItem::new(&croissant(), 2, vec![jam(-900)]).unwrap();
        assert_eq!(item.unit_total(), Decimal::ZERO);
        assert_eq!(item.subtotal(), Decimal::ZERO);
    }

    #[test]
    fn test_negative_adjustment_reduces_price() {
        let item = CartItem::new(&croissant(), 2, vec![jam(-25)]).unwrap();
        assert_eq!(item.subtotal(), Decimal::new(450, 2));
    }

    #[test]
    fn test_add_item_merges_identical_lines() {
        let mut cart = Cart::new();
        let first = cart
            .add_item(CartItem::new(&croissant(), 1, vec![jam(50)]).unwrap())
            .unwrap();
        let second = cart
            .add_item(CartItem::new(&croissant(), 2, vec![jam(50)]).unwrap())
            .unwrap();
        cart.add_item(CartItem::new(&croissant(), 1, vec![]).unwrap())
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.item_count(), 4);
        assert_eq!(cart.subtotal(), Decimal::new(1150, 2));
    }

    #[test]
    fn test_quantity_bounds() {
        assert_eq!(
            CartItem::new(&croissant(), 0, vec![]),
            Err(CartError::InvalidQuantity)
        );
        let mut cart = Cart::new();
        let line = cart
            .add_item(CartItem::new(&croissant(), MAX_LINE_QUANTITY, vec![]).unwrap())
            .unwrap();
        assert_eq!(
            cart.add_item(CartItem::new(&croissant(), 1, vec![]).unwrap()),
            Err(CartError::InvalidQuantity)
        );
        assert_eq!(
            cart.set_quantity(line, MAX_LINE_QUANTITY + 1),
            Err(CartError::InvalidQuantity)
        );
    }

    #[test]
    fn test_unavailable_product_rejected() {
        let mut product = croissant();
        product.is_available = false;
        assert_eq!(
            CartItem::new(&product, 1, vec![]),
            Err(CartError::ProductUnavailable("Croissant".to_string()))
        );
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::new();
        let line = cart
            .add_item(CartItem::new(&croissant(), 2, vec![]).unwrap())
            .unwrap();
        cart.set_quantity(line, 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.remove_item(line), Err(CartError::LineNotFound(line)));
    }

    #[test]
    fn test_clear_keeps_location_and_rotates_id() {
        let mut cart = Cart::new();
        cart.location_id = Some(LocationId::new(2));
        cart.fulfillment = FulfillmentMethod::Delivery;
        cart.loyalty_points = 300;
        cart.promo = Some(AppliedPromo {
            code: "WELCOME10".to_string(),
            discount_amount: Decimal::ONE,
        });
        cart.add_item(CartItem::new(&croissant(), 1, vec![]).unwrap())
            .unwrap();
        let old_id = cart.id;

        cart.clear();

        assert!(cart.is_empty());
        assert!(cart.promo.is_none());
        assert_eq!(cart.loyalty_points, 0);
        assert_eq!(cart.location_id, Some(LocationId::new(2)));
        assert_eq!(cart.fulfillment, FulfillmentMethod::Delivery);
        assert_ne!(cart.id, old_id);
    }

    #[test]
    fn test_normalize_promo_code() {
        assert_eq!(
            AppliedPromo::normalize_code("  welcome10 "),
            Some("WELCOME10".to_string())
        );
        assert_eq!(AppliedPromo::normalize_code("   "), None);
    }
}
