//! Request and response bodies for the bakery API.
//!
//! Catalog types (`Product`, `Location`, `ModifierGroup`) live in
//! `bakehouse-core`; this module holds the checkout-side payloads.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

use bakehouse_core::{
    CartItem, CartTotals, ChosenCustomization, Email, FulfillmentMethod, LocationId,
    ModifierGroupId, ModifierOptionId, OrderId, OrderStatus, PaymentMethod, PaymentStatus,
    ProductId,
};

// =============================================================================
// Promo Codes
// =============================================================================

/// Body of `POST /promo-codes/validate`.
#[derive(Debug, Clone, Serialize)]
pub struct PromoValidationRequest {
    pub code: String,
    pub subtotal: Decimal,
    pub location_id: Option<LocationId>,
}

/// Result of promo validation.
#[derive(Debug, Clone, Deserialize)]
pub struct PromoValidation {
    #[serde(default = "default_true")]
    pub valid: bool,
    /// Canonical code as stored by the API.
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub discount_amount: Decimal,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Orders
// =============================================================================

/// Customer contact details attached to an order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderCustomer {
    pub name: String,
    pub email: Email,
    pub phone: String,
}

/// One customization on an order line.
#[derive(Debug, Clone, Serialize)]
pub struct OrderLineCustomization {
    pub group_id: ModifierGroupId,
    pub group_name: String,
    pub option_id: ModifierOptionId,
    pub option_name: String,
    pub price_adjustment: Decimal,
}

impl From<&ChosenCustomization> for OrderLineCustomization {
    fn from(c: &ChosenCustomization) -> Self {
        Self {
            group_id: c.group_id,
            group_name: c.group_name.clone(),
            option_id: c.option_id,
            option_name: c.option_name.clone(),
            price_adjustment: c.price_adjustment,
        }
    }
}

/// One order line.
#[derive(Debug, Clone, Serialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub customizations: Vec<OrderLineCustomization>,
    pub subtotal: Decimal,
}

impl From<&CartItem> for OrderLine {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            customizations: item
                .customizations
                .iter()
                .map(OrderLineCustomization::from)
                .collect(),
            subtotal: item.subtotal(),
        }
    }
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    pub location_id: LocationId,
    pub fulfillment_method: FulfillmentMethod,
    pub customer: OrderCustomer,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<OrderLine>,
    pub promo_code: Option<String>,
    pub loyalty_points_redeemed: u32,
    pub totals: CartTotals,
    pub payment_method: PaymentMethod,
}

/// Body of `POST /orders/{id}/confirm-payment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmPaymentRequest {
    pub payment_method: PaymentMethod,
    pub transaction_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_last_four: Option<String>,
}

/// An order as reported by the bakery API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub fulfillment_method: Option<FulfillmentMethod>,
    pub total: Decimal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub estimated_ready_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Accounts
// =============================================================================

/// Body of `POST /auth/register`, sent after a guest checkout when the
/// shopper asked for an account.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterAccountRequest {
    pub name: String,
    pub email: Email,
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
    pub phone: String,
    pub order_id: OrderId,
}

fn serialize_secret<S: Serializer>(secret: &SecretString, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(secret.expose_secret())
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_from_minimal_json() {
        let order: Order = serde_json::from_str(
            r#"{"id": 81, "order_number": "BH-0081", "total": "12.40"}"#,
        )
        .unwrap();
        assert_eq!(order.id, OrderId::new(81));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.total, Decimal::new(1240, 2));
    }

    #[test]
    fn test_confirm_payment_omits_missing_card_digits() {
        let body = ConfirmPaymentRequest {
            payment_method: PaymentMethod::Cash,
            transaction_id: "cash_1".to_string(),
            card_last_four: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"payment_method": "cash", "transaction_id": "cash_1"})
        );
    }

    #[test]
    fn test_register_request_sends_password_but_debug_hides_it() {
        let req = RegisterAccountRequest {
            name: "Aoife".to_string(),
            email: Email::parse("aoife@example.ie").unwrap(),
            password: SecretString::from("hunter2-sourdough"),
            phone: "0871234567".to_string(),
            order_id: OrderId::new(5),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["password"], "hunter2-sourdough");
        assert!(!format!("{req:?}").contains("hunter2-sourdough"));
    }

    #[test]
    fn test_promo_validation_defaults() {
        let v: PromoValidation = serde_json::from_str(r#"{"discount_amount": 2.5}"#).unwrap();
        assert!(v.valid);
        assert_eq!(v.discount_amount, Decimal::new(25, 1));
        assert!(v.code.is_none());
    }
}
