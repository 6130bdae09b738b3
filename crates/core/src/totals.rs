//! Derived cart totals.
//!
//! Totals are a pure function of the cart, its location and the pricing
//! rules. Nothing here is stored; callers recompute on every read.
//!
//! Deductions are applied in a fixed order, each capped at what is left:
//! location discount, promo code, loyalty points. Tax is charged on the
//! amount remaining after deductions; the delivery fee is added on top.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::catalog::Location;
use crate::types::{FulfillmentMethod, round_money};

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Storefront-wide pricing knobs that do not come from the location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingRules {
    /// Monetary value of one loyalty point.
    pub loyalty_point_value: Decimal,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            loyalty_point_value: Decimal::new(1, 2),
        }
    }
}

/// Every figure shown at checkout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    /// Automatic location discount.
    pub discount: Decimal,
    pub tax: Decimal,
    pub loyalty_deduction: Decimal,
    pub promo_deduction: Decimal,
    pub total: Decimal,
}

impl CartTotals {
    /// Compute totals for `cart`.
    ///
    /// Without a location there is no discount, delivery fee or tax.
    #[must_use]
    pub fn compute(cart: &Cart, location: Option<&Location>, rules: &PricingRules) -> Self {
        if cart.is_empty() {
            return Self::default();
        }

        let subtotal = cart.subtotal();
        let mut remaining = subtotal.max(Decimal::ZERO);

        let discount = location.map_or(Decimal::ZERO, |loc| {
            let pct = loc.discount_percent.clamp(Decimal::ZERO, ONE_HUNDRED);
            round_money(remaining * pct / ONE_HUNDRED)
        });
        remaining -= discount;

        let promo_deduction = cart.promo.as_ref().map_or(Decimal::ZERO, |p| {
            p.discount_amount.max(Decimal::ZERO).min(remaining)
        });
        remaining -= promo_deduction;

        let loyalty_deduction = round_money(
            Decimal::from(cart.loyalty_points) * rules.loyalty_point_value.max(Decimal::ZERO),
        )
        .min(remaining);
        remaining -= loyalty_deduction;

        let delivery_fee = match (cart.fulfillment, location) {
            (FulfillmentMethod::Delivery, Some(loc)) => {
                let free = loc
                    .free_delivery_threshold
                    .is_some_and(|threshold| subtotal >= threshold);
                if free { Decimal::ZERO } else { loc.delivery_fee }
            }
            _ => Decimal::ZERO,
        };

        let tax = location.map_or(Decimal::ZERO, |loc| {
            round_money(remaining * loc.tax_rate.max(Decimal::ZERO))
        });

        let total = (remaining + delivery_fee + tax).max(Decimal::ZERO);

        Self {
            subtotal,
            delivery_fee,
            discount,
            tax,
            loyalty_deduction,
            promo_deduction,
            total,
        }
    }

    /// Loyalty points that actually count towards the deduction, given the
    /// cap applied by [`CartTotals::compute`].
    ///
    /// Never more than `requested`.
    #[must_use]
    pub fn effective_loyalty_points(&self, requested: u32, rules: &PricingRules) -> u32 {
        if rules.loyalty_point_value <= Decimal::ZERO || self.loyalty_deduction <= Decimal::ZERO {
            return 0;
        }
        (self.loyalty_deduction / rules.loyalty_point_value)
            .ceil()
            .to_u32()
            .map_or(requested, |needed| needed.min(requested))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::{AppliedPromo, CartItem};
    use crate::catalog::{ChosenCustomization, Product};
    use crate::types::{LocationId, ModifierGroupId, ModifierOptionId, ProductId};

    fn d(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    fn product(price_cents: i64) -> Product {
        Product {
            id: ProductId::new(price_cents),
            name: format!("item-{price_cents}"),
            description: None,
            base_price: d(price_cents),
            category_id: None,
            image_url: None,
            is_available: true,
        }
    }

    fn cart_with(prices: &[(i64, u32)]) -> Cart {
        let mut cart = Cart::new();
        for &(price, qty) in prices {
            cart.add_item(CartItem::new(&product(price), qty, vec![]).unwrap())
                .unwrap();
        }
        cart
    }

    fn location() -> Location {
        Location {
            id: LocationId::new(1),
            name: "Main Street".to_string(),
            address: None,
            delivery_enabled: true,
            collection_enabled: true,
            delivery_fee: d(350),
            free_delivery_threshold: Some(d(3000)),
            min_delivery_order: Some(d(1000)),
            tax_rate: Decimal::new(9, 2),
            discount_percent: Decimal::ZERO,
        }
    }

    #[test]
    fn test_empty_cart_is_all_zero() {
        let mut cart = Cart::new();
        cart.loyalty_points = 500;
        let totals = CartTotals::compute(&cart, Some(&location()), &PricingRules::default());
        assert_eq!(totals, CartTotals::default());
    }

    #[test]
    fn test_collection_without_deductions() {
        let cart = cart_with(&[(250, 2), (400, 1)]);
        let totals = CartTotals::compute(&cart, Some(&location()), &PricingRules::default());

        assert_eq!(totals.subtotal, d(900));
        assert_eq!(totals.delivery_fee, Decimal::ZERO);
        assert_eq!(totals.tax, d(81));
        assert_eq!(totals.total, d(981));
    }

    #[test]
    fn test_delivery_fee_and_free_threshold() {
        let mut cart = cart_with(&[(1000, 1)]);
        cart.fulfillment = FulfillmentMethod::Delivery;
        let rules = PricingRules::default();

        let totals = CartTotals::compute(&cart, Some(&location()), &rules);
        assert_eq!(totals.delivery_fee, d(350));
        assert_eq!(totals.total, d(1000) + d(90) + d(350));

        cart.items[0].quantity = 3;
        let totals = CartTotals::compute(&cart, Some(&location()), &rules);
        assert_eq!(totals.delivery_fee, Decimal::ZERO);
    }

    #[test]
    fn test_deductions_apply_in_order_and_cap() {
        let mut cart = cart_with(&[(1000, 1)]);
        let mut loc = location();
        loc.discount_percent = Decimal::from(10);
        loc.tax_rate = Decimal::ZERO;
        cart.promo = Some(AppliedPromo {
            code: "HALF".to_string(),
            discount_amount: d(500),
        });
        cart.loyalty_points = 1000;

        let totals = CartTotals::compute(&cart, Some(&loc), &PricingRules::default());
        assert_eq!(totals.discount, d(100));
        assert_eq!(totals.promo_deduction, d(500));
        // 1000 points are worth 10.00 but only 4.00 remain.
        assert_eq!(totals.loyalty_deduction, d(400));
        assert_eq!(totals.total, Decimal::ZERO);
        assert_eq!(
            totals.effective_loyalty_points(cart.loyalty_points, &PricingRules::default()),
            400
        );
    }

    #[test]
    fn test_promo_larger_than_subtotal_never_goes_negative() {
        let mut cart = cart_with(&[(300, 1)]);
        cart.promo = Some(AppliedPromo {
            code: "BIG".to_string(),
            discount_amount: d(2000),
        });
        let totals = CartTotals::compute(&cart, Some(&location()), &PricingRules::default());
        assert_eq!(totals.promo_deduction, d(300));
        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_no_location_means_no_fees_or_tax() {
        let mut cart = cart_with(&[(500, 2)]);
        cart.fulfillment = FulfillmentMethod::Delivery;
        let totals = CartTotals::compute(&cart, None, &PricingRules::default());
        assert_eq!(totals.delivery_fee, Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.total, d(1000));
    }

    #[test]
    fn test_fractional_point_value_never_redeems_more_than_requested() {
        let mut cart = cart_with(&[(1000, 1)]);
        cart.loyalty_points = 3;
        let rules = PricingRules {
            loyalty_point_value: Decimal::new(15, 3),
        };

        let totals = CartTotals::compute(&cart, None, &rules);
        // 3 x 0.015 = 0.045, rounded to 0.05
        assert_eq!(totals.loyalty_deduction, d(5));
        assert_eq!(totals.effective_loyalty_points(cart.loyalty_points, &rules), 3);
    }

    #[test]
    fn test_capped_fractional_points_stay_within_request() {
        let mut cart = cart_with(&[(10, 1)]);
        cart.loyalty_points = 50;
        let rules = PricingRules {
            loyalty_point_value: Decimal::new(15, 3),
        };

        let totals = CartTotals::compute(&cart, None, &rules);
        assert_eq!(totals.loyalty_deduction, d(10));
        // 0.10 / 0.015 = 6.67, so 7 points cover it
        assert_eq!(totals.effective_loyalty_points(cart.loyalty_points, &rules), 7);
        assert_eq!(totals.effective_loyalty_points(5, &rules), 5);
    }

    #[test]
    fn test_negative_modifiers_never_produce_negative_deductions() {
        let tasting_spoon = ChosenCustomization {
            group_id: ModifierGroupId::new(1),
            group_name: "Size".to_string(),
            option_id: ModifierOptionId::new(1),
            option_name: "Tasting spoon".to_string(),
            price_adjustment: d(-300),
        };
        let mut cart = Cart::new();
        cart.add_item(CartItem::new(&product(100), 1, vec![tasting_spoon]).unwrap())
            .unwrap();
        cart.promo = Some(AppliedPromo {
            code: "WELCOME5".to_string(),
            discount_amount: d(500),
        });
        let mut loc = location();
        loc.discount_percent = Decimal::from(10);

        let totals = CartTotals::compute(&cart, Some(&loc), &PricingRules::default());
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.promo_deduction, Decimal::ZERO);
        assert_eq!(totals.loyalty_deduction, Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }
}
