//! Catalog types as served by the bakery API.
//!
//! Products and locations are read-only from the storefront's point of view.
//! Modifier groups hang off a product and carry their options inline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    CategoryId, FulfillmentMethod, LocationId, ModifierGroupId, ModifierOptionId, ProductId,
};

// =============================================================================
// Products
// =============================================================================

/// A product on the menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Price before any customization.
    pub base_price: Decimal,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

// =============================================================================
// Locations
// =============================================================================

/// A shop location orders are placed against.
///
/// Carries the pricing knobs that feed [`crate::CartTotals`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub delivery_enabled: bool,
    #[serde(default = "default_true")]
    pub collection_enabled: bool,
    /// Flat delivery charge.
    #[serde(default)]
    pub delivery_fee: Decimal,
    /// Subtotal at or above which delivery is free.
    #[serde(default)]
    pub free_delivery_threshold: Option<Decimal>,
    /// Smallest subtotal accepted for delivery orders.
    #[serde(default)]
    pub min_delivery_order: Option<Decimal>,
    /// Tax as a fraction (0.135 = 13.5%).
    #[serde(default)]
    pub tax_rate: Decimal,
    /// Automatic discount applied to every order, in percent.
    #[serde(default)]
    pub discount_percent: Decimal,
}

impl Location {
    /// Whether this location accepts the given fulfillment method.
    #[must_use]
    pub const fn supports(&self, method: FulfillmentMethod) -> bool {
        match method {
            FulfillmentMethod::Delivery => self.delivery_enabled,
            FulfillmentMethod::Collection => self.collection_enabled,
        }
    }
}

// =============================================================================
// Modifiers
// =============================================================================

/// Whether a modifier group behaves like radio buttons or checkboxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionType {
    Single,
    Multi,
}

/// A named set of selectable options for a product (e.g. "Sauce").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierGroup {
    pub id: ModifierGroupId,
    pub product_id: ProductId,
    pub name: String,
    pub selection_type: SelectionType,
    #[serde(default)]
    pub min_selections: u32,
    /// Upper bound for `multi` groups. Ignored for `single` groups.
    #[serde(default)]
    pub max_selections: Option<u32>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub options: Vec<ModifierOption>,
}

/// One choice within a modifier group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierOption {
    pub id: ModifierOptionId,
    pub group_id: ModifierGroupId,
    pub name: String,
    /// Signed price delta added to the product price when chosen.
    #[serde(default)]
    pub price_adjustment: Decimal,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub display_order: i32,
}

impl ModifierGroup {
    /// Effective upper bound on the number of selections.
    ///
    /// `single` groups always allow one; `multi` groups allow
    /// `max_selections` when set and are unbounded otherwise.
    #[must_use]
    pub const fn selection_limit(&self) -> Option<u32> {
        match self.selection_type {
            SelectionType::Single => Some(1),
            SelectionType::Multi => self.max_selections,
        }
    }

    /// Look up an option of this group by id.
    #[must_use]
    pub fn option(&self, id: ModifierOptionId) -> Option<&ModifierOption> {
        self.options.iter().find(|o| o.id == id)
    }

    /// The shopper-facing view: unavailable options dropped, options ordered
    /// by display index.
    #[must_use]
    pub fn customer_facing(mut self) -> Self {
        self.options.retain(|o| o.is_available);
        self.options.sort_by_key(|o| (o.display_order, o.id));
        self
    }
}

/// Order modifier groups for display and apply [`ModifierGroup::customer_facing`]
/// to each.
#[must_use]
pub fn customer_facing_groups(groups: Vec<ModifierGroup>) -> Vec<ModifierGroup> {
    let mut groups: Vec<_> = groups
        .into_iter()
        .map(ModifierGroup::customer_facing)
        .collect();
    groups.sort_by_key(|g| (g.display_order, g.id));
    groups
}

/// A modifier choice frozen at selection time.
///
/// Names and price are copied so that a cart line keeps its price even if
/// the menu changes while the shopper is browsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChosenCustomization {
    pub group_id: ModifierGroupId,
    pub group_name: String,
    pub option_id: ModifierOptionId,
    pub option_name: String,
    pub price_adjustment: Decimal,
}

const fn default_true() -> bool {
    true
}
