//! The bakery API calls checkout depends on.
//!
//! Checkout and promo logic is written against [`OrderGateway`] so it can be
//! exercised with an in-memory fake; [`BakeryClient`] is the production
//! implementation.

use async_trait::async_trait;

use bakehouse_core::OrderId;

use crate::bakery::{
    BakeryClient, BakeryError, ConfirmPaymentRequest, CreateOrderRequest, Order, PromoValidation,
    PromoValidationRequest, RegisterAccountRequest,
};

/// Order, payment, promo and account endpoints of the bakery API.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Validate a promo code.
    async fn validate_promo(
        &self,
        request: &PromoValidationRequest,
    ) -> Result<PromoValidation, BakeryError>;

    /// Create an order record.
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, BakeryError>;

    /// Confirm payment for a created order.
    async fn confirm_payment(
        &self,
        order_id: OrderId,
        request: &ConfirmPaymentRequest,
    ) -> Result<Option<Order>, BakeryError>;

    /// Register a customer account.
    async fn register_account(&self, request: &RegisterAccountRequest) -> Result<(), BakeryError>;
}

#[async_trait]
impl OrderGateway for BakeryClient {
    async fn validate_promo(
        &self,
        request: &PromoValidationRequest,
    ) -> Result<PromoValidation, BakeryError> {
        Self::validate_promo(self, request).await
    }

    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, BakeryError> {
        Self::create_order(self, request).await
    }

    async fn confirm_payment(
        &self,
        order_id: OrderId,
        request: &ConfirmPaymentRequest,
    ) -> Result<Option<Order>, BakeryError> {
        Self::confirm_payment(self, order_id, request).await
    }

    async fn register_account(&self, request: &RegisterAccountRequest) -> Result<(), BakeryError> {
        Self::register_account(self, request).await
    }
}
