//! Promo codes and order placement.
//!
//! Placing an order is a strict two-step sequence against the bakery API:
//!
//! 1. `create_order` with the full line items, fulfillment details and totals
//! 2. after a short simulated payment delay, `confirm_payment` with a
//!    synthesized transaction id
//!
//! The cart is only cleared once both steps succeed. A failure at either
//! step leaves it untouched; a confirmation failure reports the id of the
//! order that was already created.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use bakehouse_core::{
    AppliedPromo, Cart, CartTotals, Email, EmailError, FulfillmentMethod, Location, OrderId,
    PaymentMethod, PricingRules,
};

use super::OrderGateway;
use crate::bakery::{
    BakeryError, ConfirmPaymentRequest, CreateOrderRequest, Order, OrderCustomer, OrderLine,
    PromoValidationRequest, RegisterAccountRequest,
};
use crate::config::CheckoutConfig;
use crate::models::CheckoutDraft;

/// Shortest password accepted for an account created at checkout.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors from promo application and order placement.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Please choose a location before checking out")]
    NoLocation,

    #[error("{location} does not offer {method}")]
    FulfillmentUnavailable {
        location: String,
        method: FulfillmentMethod,
    },

    #[error("Delivery orders must be at least {minimum}")]
    BelowDeliveryMinimum { minimum: Decimal },

    #[error("Please enter your {0}")]
    MissingField(&'static str),

    #[error("Invalid email address: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Card number must be 13 to 19 digits")]
    InvalidCard,

    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters")]
    WeakPassword,

    #[error("Please enter a promo code")]
    BlankPromoCode,

    #[error("{0}")]
    PromoRejected(String),

    #[error("A checkout for this cart is already in progress")]
    AlreadyInProgress,

    #[error("Promo validation failed: {0}")]
    PromoValidation(#[source] BakeryError),

    #[error("Order creation failed: {0}")]
    CreateOrder(#[source] BakeryError),

    #[error("Payment confirmation failed for order {order_number}: {source}")]
    ConfirmPayment {
        order_id: OrderId,
        order_number: String,
        #[source]
        source: BakeryError,
    },
}

impl CheckoutError {
    /// Whether the shopper can fix this by changing their input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyCart
                | Self::NoLocation
                | Self::FulfillmentUnavailable { .. }
                | Self::BelowDeliveryMinimum { .. }
                | Self::MissingField(_)
                | Self::InvalidEmail(_)
                | Self::InvalidCard
                | Self::WeakPassword
                | Self::BlankPromoCode
                | Self::PromoRejected(_)
        )
    }
}

// =============================================================================
// Promo Codes
// =============================================================================

/// Validate `raw_code` with the bakery API and store it on the cart.
///
/// On any failure the cart's existing promo is left exactly as it was.
///
/// # Errors
///
/// Returns [`CheckoutError::PromoRejected`] with the API's message when the
/// code is refused, or another error if validation could not run.
#[instrument(skip(gateway, cart), fields(cart_id = %cart.id))]
pub async fn apply_promo<G: OrderGateway + ?Sized>(
    gateway: &G,
    cart: &mut Cart,
    raw_code: &str,
) -> Result<AppliedPromo, CheckoutError> {
    let code = AppliedPromo::normalize_code(raw_code).ok_or(CheckoutError::BlankPromoCode)?;
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let request = PromoValidationRequest {
        code: code.clone(),
        subtotal: cart.subtotal(),
        location_id: cart.location_id,
    };

    let validation = match gateway.validate_promo(&request).await {
        Ok(v) => v,
        Err(e) => {
            return Err(e.rejection_message().map(str::to_string).map_or_else(
                || CheckoutError::PromoValidation(e),
                CheckoutError::PromoRejected,
            ));
        }
    };

    if !validation.valid {
        return Err(CheckoutError::PromoRejected(
            validation
                .message
                .unwrap_or_else(|| "This promo code is not valid".to_string()),
        ));
    }

    let promo = AppliedPromo {
        code: validation
            .code
            .as_deref()
            .and_then(AppliedPromo::normalize_code)
            .unwrap_or(code),
        discount_amount: validation.discount_amount.max(Decimal::ZERO),
    };
    tracing::info!(code = %promo.code, discount = %promo.discount_amount, "Promo applied");
    cart.promo = Some(promo.clone());
    Ok(promo)
}

// =============================================================================
// Order Placement
// =============================================================================

/// How the shopper pays.
///
/// Implements `Debug` manually so card numbers never reach the logs.
#[derive(Clone, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentDetails {
    Cash,
    Card { card_number: String },
}

impl fmt::Debug for PaymentDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cash => f.write_str("Cash"),
            Self::Card { .. } => f
                .debug_struct("Card")
                .field("card_number", &"[REDACTED]")
                .finish(),
        }
    }
}

impl PaymentDetails {
    #[must_use]
    pub const fn method(&self) -> PaymentMethod {
        match self {
            Self::Cash => PaymentMethod::Cash,
            Self::Card { .. } => PaymentMethod::Card,
        }
    }

    /// Last four digits of the card, ignoring spaces and dashes.
    fn card_last_four(&self) -> Result<Option<String>, CheckoutError> {
        let Self::Card { card_number } = self else {
            return Ok(None);
        };

        let digits: String = card_number
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect();
        if !(13..=19).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(CheckoutError::InvalidCard);
        }
        Ok(Some(digits[digits.len() - 4..].to_string()))
    }
}

/// Body of an order submission.
#[derive(Clone, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(flatten)]
    pub contact: CheckoutDraft,
    pub payment: PaymentDetails,
    /// When set, an account is registered for the shopper after the order.
    #[serde(default)]
    pub account_password: Option<String>,
}

impl fmt::Debug for PlaceOrderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaceOrderRequest")
            .field("contact", &self.contact)
            .field("payment", &self.payment)
            .field(
                "account_password",
                &self.account_password.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Session state an order submission reads and, on success, clears.
#[derive(Debug, Clone, Default)]
pub struct CheckoutContext {
    pub cart: Cart,
    pub draft: Option<CheckoutDraft>,
}

/// Result of a successful checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOutcome {
    pub order: Order,
    /// Where the shopper goes next. Present exactly once per order.
    pub redirect_to: String,
    /// Problems that did not stop the order, such as a failed account
    /// registration.
    pub warnings: Vec<String>,
}

/// Path of the confirmation view for an order.
#[must_use]
pub fn confirmation_path(order_id: OrderId) -> String {
    format!("/orders/{order_id}/confirmation")
}

/// Synthesized payment transaction id: `cash_<millis>` or `txn_<millis>`.
#[must_use]
pub fn transaction_id(method: PaymentMethod, at: DateTime<Utc>) -> String {
    format!("{}_{}", method.transaction_prefix(), at.timestamp_millis())
}

/// A submission that passed validation.
struct PreparedOrder {
    order: CreateOrderRequest,
    payment_method: PaymentMethod,
    card_last_four: Option<String>,
    account_password: Option<SecretString>,
}

/// Check a submission against the cart and location and build the order.
fn prepare(
    cart: &Cart,
    location: &Location,
    request: PlaceOrderRequest,
    rules: &PricingRules,
) -> Result<PreparedOrder, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    if cart.location_id != Some(location.id) {
        return Err(CheckoutError::NoLocation);
    }
    if !location.supports(cart.fulfillment) {
        return Err(CheckoutError::FulfillmentUnavailable {
            location: location.name.clone(),
            method: cart.fulfillment,
        });
    }

    let contact = request.contact.normalized();
    if contact.name.is_empty() {
        return Err(CheckoutError::MissingField("name"));
    }
    if contact.phone.is_empty() {
        return Err(CheckoutError::MissingField("phone number"));
    }
    let email = Email::parse(&contact.email)?;

    let delivery_address = match cart.fulfillment {
        FulfillmentMethod::Delivery => {
            let address = contact
                .delivery_address
                .ok_or(CheckoutError::MissingField("delivery address"))?;
            if let Some(minimum) = location.min_delivery_order
                && cart.subtotal() < minimum
            {
                return Err(CheckoutError::BelowDeliveryMinimum { minimum });
            }
            Some(address)
        }
        FulfillmentMethod::Collection => None,
    };

    let card_last_four = request.payment.card_last_four()?;
    let account_password = match request.account_password {
        Some(p) if p.chars().count() < MIN_PASSWORD_LENGTH => {
            return Err(CheckoutError::WeakPassword);
        }
        Some(p) => Some(SecretString::from(p)),
        None => None,
    };

    let totals = CartTotals::compute(cart, Some(location), rules);
    let order = CreateOrderRequest {
        location_id: location.id,
        fulfillment_method: cart.fulfillment,
        customer: OrderCustomer {
            name: contact.name,
            email,
            phone: contact.phone,
        },
        delivery_address,
        notes: contact.notes,
        items: cart.items.iter().map(OrderLine::from).collect(),
        promo_code: cart.promo.as_ref().map(|p| p.code.clone()),
        loyalty_points_redeemed: totals.effective_loyalty_points(cart.loyalty_points, rules),
        totals,
        payment_method: request.payment.method(),
    };

    Ok(PreparedOrder {
        order,
        payment_method: request.payment.method(),
        card_last_four,
        account_password,
    })
}

/// Place an order for the cart in `ctx`.
///
/// On success the cart and checkout draft in `ctx` are cleared. When an
/// account password was supplied, registration runs afterwards; its failure
/// becomes a warning on the outcome.
///
/// # Errors
///
/// Returns a validation error before anything is sent, or the failing step's
/// error. Neither leaves `ctx` modified.
#[instrument(
    skip(gateway, config, ctx, location, request),
    fields(cart_id = %ctx.cart.id, location_id = %location.id)
)]
pub async fn place_order<G: OrderGateway + ?Sized>(
    gateway: &G,
    config: &CheckoutConfig,
    ctx: &mut CheckoutContext,
    location: &Location,
    request: PlaceOrderRequest,
) -> Result<CheckoutOutcome, CheckoutError> {
    let prepared = prepare(&ctx.cart, location, request, &config.pricing)?;

    let created = gateway
        .create_order(&prepared.order)
        .await
        .map_err(CheckoutError::CreateOrder)?;
    tracing::info!(
        order_id = %created.id,
        order_number = %created.order_number,
        total = %created.total,
        "Order created"
    );

    if !config.payment_confirmation_delay.is_zero() {
        tokio::time::sleep(config.payment_confirmation_delay).await;
    }

    let confirm = ConfirmPaymentRequest {
        payment_method: prepared.payment_method,
        transaction_id: transaction_id(prepared.payment_method, Utc::now()),
        card_last_four: prepared.card_last_four,
    };

    let order = match gateway.confirm_payment(created.id, &confirm).await {
        Ok(confirmed) => confirmed.unwrap_or(created),
        Err(source) => {
            tracing::error!(
                order_id = %created.id,
                error = %source,
                "Payment confirmation failed after order creation"
            );
            return Err(CheckoutError::ConfirmPayment {
                order_id: created.id,
                order_number: created.order_number,
                source,
            });
        }
    };
    tracing::info!(
        order_id = %order.id,
        transaction_id = %confirm.transaction_id,
        "Payment confirmed"
    );

    ctx.cart.clear();
    ctx.draft = None;

    let mut warnings = Vec::new();
    if let Some(password) = prepared.account_password {
        let customer = prepared.order.customer;
        let request = RegisterAccountRequest {
            name: customer.name,
            email: customer.email,
            password,
            phone: customer.phone,
            order_id: order.id,
        };
        if let Err(e) = gateway.register_account(&request).await {
            tracing::warn!(order_id = %order.id, error = %e, "Account registration failed");
            warnings.push(format!(
                "Your order was placed, but we could not create your account: {}",
                e.rejection_message().unwrap_or("please try again later")
            ));
        }
    }

    Ok(CheckoutOutcome {
        redirect_to: confirmation_path(order.id),
        order,
        warnings,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use reqwest::StatusCode;

    use bakehouse_core::{CartItem, LocationId, OrderStatus, PaymentStatus, Product, ProductId};

    use super::*;
    use crate::bakery::PromoValidation;

    #[derive(Default)]
    struct FakeGateway {
        fail_create: bool,
        fail_confirm: bool,
        fail_register: bool,
        promo: Option<Result<PromoValidation, String>>,
        created: Mutex<Vec<CreateOrderRequest>>,
        confirmed: Mutex<Vec<(OrderId, ConfirmPaymentRequest)>>,
        registered: Mutex<Vec<OrderId>>,
    }

    fn rejected(message: &str) -> BakeryError {
        BakeryError::Rejected {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.to_string(),
        }
    }

    fn order(status: OrderStatus, payment_status: PaymentStatus) -> Order {
        Order {
            id: OrderId::new(42),
            order_number: "BH-0042".to_string(),
            status,
            payment_status,
            fulfillment_method: None,
            total: Decimal::new(981, 2),
            created_at: None,
            estimated_ready_at: None,
        }
    }

    #[async_trait::async_trait]
    impl OrderGateway for FakeGateway {
        async fn validate_promo(
            &self,
            _request: &PromoValidationRequest,
        ) -> Result<PromoValidation, BakeryError> {
            match self.promo.clone() {
                Some(Ok(v)) => Ok(v),
                Some(Err(m)) => Err(rejected(&m)),
                None => Err(BakeryError::Upstream {
                    status: StatusCode::BAD_GATEWAY,
                    message: "down".to_string(),
                }),
            }
        }

        async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, BakeryError> {
            self.created.lock().unwrap().push(request.clone());
            if self.fail_create {
                return Err(rejected("Location is closed"));
            }
            Ok(order(OrderStatus::Pending, PaymentStatus::Pending))
        }

        async fn confirm_payment(
            &self,
            order_id: OrderId,
            request: &ConfirmPaymentRequest,
        ) -> Result<Option<Order>, BakeryError> {
            self.confirmed
                .lock()
                .unwrap()
                .push((order_id, request.clone()));
            if self.fail_confirm {
                return Err(BakeryError::Upstream {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "payment processor unavailable".to_string(),
                });
            }
            Ok(Some(order(OrderStatus::Confirmed, PaymentStatus::Paid)))
        }

        async fn register_account(
            &self,
            request: &RegisterAccountRequest,
        ) -> Result<(), BakeryError> {
            self.registered.lock().unwrap().push(request.order_id);
            if self.fail_register {
                return Err(rejected("An account with this email already exists"));
            }
            Ok(())
        }
    }

    fn config() -> CheckoutConfig {
        CheckoutConfig {
            payment_confirmation_delay: Duration::ZERO,
            pricing: PricingRules::default(),
        }
    }

    fn location() -> Location {
        Location {
            id: LocationId::new(1),
            name: "Main Street".to_string(),
            address: None,
            delivery_enabled: true,
            collection_enabled: true,
            delivery_fee: Decimal::new(350, 2),
            free_delivery_threshold: None,
            min_delivery_order: Some(Decimal::new(1500, 2)),
            tax_rate: Decimal::new(9, 2),
            discount_percent: Decimal::ZERO,
        }
    }

    fn context() -> CheckoutContext {
        let product = Product {
            id: ProductId::new(7),
            name: "Sourdough".to_string(),
            description: None,
            base_price: Decimal::new(450, 2),
            category_id: None,
            image_url: None,
            is_available: true,
        };
        let mut cart = Cart::new();
        cart.location_id = Some(LocationId::new(1));
        cart.add_item(CartItem::new(&product, 2, vec![]).unwrap())
            .unwrap();
        CheckoutContext {
            cart,
            draft: Some(CheckoutDraft {
                name: "Niamh".to_string(),
                ..CheckoutDraft::default()
            }),
        }
    }

    fn request(payment: PaymentDetails) -> PlaceOrderRequest {
        PlaceOrderRequest {
            contact: CheckoutDraft {
                name: "Niamh Byrne".to_string(),
                email: "niamh@example.ie".to_string(),
                phone: "0871112233".to_string(),
                delivery_address: None,
                notes: Some("No nuts please".to_string()),
            },
            payment,
            account_password: None,
        }
    }

    #[tokio::test]
    async fn test_success_clears_cart_and_redirects_once() {
        let gateway = FakeGateway::default();
        let mut ctx = context();

        let outcome = place_order(
            &gateway,
            &config(),
            &mut ctx,
            &location(),
            request(PaymentDetails::Cash),
        )
        .await
        .unwrap();

        assert!(ctx.cart.is_empty());
        assert!(ctx.draft.is_none());
        assert_eq!(outcome.redirect_to, "/orders/42/confirmation");
        assert_eq!(outcome.order.payment_status, PaymentStatus::Paid);
        assert!(outcome.warnings.is_empty());

        let created = gateway.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].items.len(), 1);
        assert_eq!(created[0].totals.subtotal, Decimal::new(900, 2));
        assert_eq!(created[0].notes.as_deref(), Some("No nuts please"));

        let confirmed = gateway.confirmed.lock().unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].0, OrderId::new(42));
        assert!(confirmed[0].1.transaction_id.starts_with("cash_"));
        assert_eq!(confirmed[0].1.card_last_four, None);
    }

    #[tokio::test]
    async fn test_create_failure_skips_confirmation_and_keeps_cart() {
        let gateway = FakeGateway {
            fail_create: true,
            ..FakeGateway::default()
        };
        let mut ctx = context();
        let before = ctx.cart.clone();

        let err = place_order(
            &gateway,
            &config(),
            &mut ctx,
            &location(),
            request(PaymentDetails::Cash),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CheckoutError::CreateOrder(_)));
        assert!(gateway.confirmed.lock().unwrap().is_empty());
        assert_eq!(ctx.cart, before);
        assert!(ctx.draft.is_some());
    }

    #[tokio::test]
    async fn test_confirm_failure_reports_created_order() {
        let gateway = FakeGateway {
            fail_confirm: true,
            ..FakeGateway::default()
        };
        let mut ctx = context();

        let err = place_order(
            &gateway,
            &config(),
            &mut ctx,
            &location(),
            request(PaymentDetails::Cash),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::ConfirmPayment { order_id, .. } if order_id == OrderId::new(42)
        ));
        assert!(err.to_string().contains("BH-0042"));
        assert!(!ctx.cart.is_empty());
    }

    #[tokio::test]
    async fn test_card_payment_sends_last_four() {
        let gateway = FakeGateway::default();
        let mut ctx = context();

        place_order(
            &gateway,
            &config(),
            &mut ctx,
            &location(),
            request(PaymentDetails::Card {
                card_number: "4242 4242 4242 1881".to_string(),
            }),
        )
        .await
        .unwrap();

        let confirmed = gateway.confirmed.lock().unwrap();
        assert!(confirmed[0].1.transaction_id.starts_with("txn_"));
        assert_eq!(confirmed[0].1.card_last_four.as_deref(), Some("1881"));
        assert_eq!(confirmed[0].1.payment_method, PaymentMethod::Card);
    }

    #[tokio::test]
    async fn test_validation_happens_before_any_call() {
        let gateway = FakeGateway::default();
        let mut ctx = context();
        ctx.cart.fulfillment = FulfillmentMethod::Delivery;

        let err = place_order(
            &gateway,
            &config(),
            &mut ctx,
            &location(),
            request(PaymentDetails::Cash),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CheckoutError::MissingField("delivery address")));

        let mut with_address = request(PaymentDetails::Cash);
        with_address.contact.delivery_address = Some("1 Quay St".to_string());
        let err = place_order(&gateway, &config(), &mut ctx, &location(), with_address)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::BelowDeliveryMinimum { .. }));

        let mut bad_card = request(PaymentDetails::Card {
            card_number: "1234".to_string(),
        });
        bad_card.contact.delivery_address = Some("1 Quay St".to_string());
        ctx.cart.fulfillment = FulfillmentMethod::Collection;
        let err = place_order(&gateway, &config(), &mut ctx, &location(), bad_card)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidCard));
        assert!(err.is_validation());

        assert!(gateway.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let gateway = FakeGateway::default();
        let mut ctx = context();
        ctx.cart.items.clear();

        let err = place_order(
            &gateway,
            &config(),
            &mut ctx,
            &location(),
            request(PaymentDetails::Cash),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
    }

    #[tokio::test]
    async fn test_registration_failure_is_a_warning() {
        let gateway = FakeGateway {
            fail_register: true,
            ..FakeGateway::default()
        };
        let mut ctx = context();
        let mut req = request(PaymentDetails::Cash);
        req.account_password = Some("crusty-loaf-99".to_string());

        let outcome = place_order(&gateway, &config(), &mut ctx, &location(), req)
            .await
            .unwrap();

        assert_eq!(gateway.registered.lock().unwrap().as_slice(), &[OrderId::new(42)]);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("already exists"));
        assert!(ctx.cart.is_empty());
    }

    #[tokio::test]
    async fn test_short_password_rejected_up_front() {
        let gateway = FakeGateway::default();
        let mut ctx = context();
        let mut req = request(PaymentDetails::Cash);
        req.account_password = Some("short".to_string());

        let err = place_order(&gateway, &config(), &mut ctx, &location(), req)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::WeakPassword));
        assert!(gateway.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_promo_stores_normalized_code() {
        let gateway = FakeGateway {
            promo: Some(Ok(PromoValidation {
                valid: true,
                code: None,
                discount_amount: Decimal::new(150, 2),
                message: None,
            })),
            ..FakeGateway::default()
        };
        let mut ctx = context();

        let promo = apply_promo(&gateway, &mut ctx.cart, "  welcome10 ")
            .await
            .unwrap();
        assert_eq!(promo.code, "WELCOME10");
        assert_eq!(ctx.cart.promo, Some(promo));
    }

    #[tokio::test]
    async fn test_rejected_promo_keeps_existing_discount() {
        let gateway = FakeGateway {
            promo: Some(Err("Promo code has expired".to_string())),
            ..FakeGateway::default()
        };
        let mut ctx = context();
        let existing = AppliedPromo {
            code: "SPRING".to_string(),
            discount_amount: Decimal::ONE,
        };
        ctx.cart.promo = Some(existing.clone());

        let err = apply_promo(&gateway, &mut ctx.cart, "OLDCODE")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Promo code has expired");
        assert_eq!(ctx.cart.promo, Some(existing.clone()));

        let down = FakeGateway::default();
        let err = apply_promo(&down, &mut ctx.cart, "OLDCODE")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::PromoValidation(_)));
        assert_eq!(ctx.cart.promo, Some(existing));
    }

    #[tokio::test]
    async fn test_invalid_flag_uses_api_message() {
        let gateway = FakeGateway {
            promo: Some(Ok(PromoValidation {
                valid: false,
                code: None,
                discount_amount: Decimal::ZERO,
                message: Some("Minimum spend not met".to_string()),
            })),
            ..FakeGateway::default()
        };
        let mut ctx = context();
        let err = apply_promo(&gateway, &mut ctx.cart, "BIGSPEND")
            .await
            .unwrap_err();
        assert!(
            matches!(err, CheckoutError::PromoRejected(ref m) if m == "Minimum spend not met")
        );
        assert!(ctx.cart.promo.is_none());
    }

    #[test]
    fn test_transaction_id_format() {
        let at = DateTime::from_timestamp_millis(1_760_000_000_123).unwrap();
        assert_eq!(transaction_id(PaymentMethod::Cash, at), "cash_1760000000123");
        assert_eq!(transaction_id(PaymentMethod::Card, at), "txn_1760000000123");
    }

    #[test]
    fn test_payment_details_debug_redacts_card() {
        let payment: PaymentDetails =
            serde_json::from_str(r#"{"method": "card", "card_number": "4000056655665556"}"#)
                .unwrap();
        assert_eq!(payment.method(), PaymentMethod::Card);
        assert!(!format!("{payment:?}").contains("5556"));
    }
}
