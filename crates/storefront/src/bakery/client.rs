//! Bakery REST API client implementation.
//!
//! Uses `reqwest` with a per-request timeout and bearer-token auth.
//! Caches catalog reads using `moka` (5-minute TTL).

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use bakehouse_core::{
    Location, LocationId, ModifierGroup, OrderId, Product, ProductId, customer_facing_groups,
};

use super::BakeryError;
use super::cache::{CacheKey, CacheValue};
use super::types::{
    ConfirmPaymentRequest, CreateOrderRequest, Order, PromoValidation, PromoValidationRequest,
    RegisterAccountRequest,
};
use crate::config::BakeryApiConfig;

const CACHE_TTL: Duration = Duration::from_secs(300);
const CACHE_CAPACITY: u64 = 1000;

// =============================================================================
// BakeryClient
// =============================================================================

/// Client for the bakery REST API.
///
/// Cheap to clone. Catalog reads (products, modifier groups, locations) are
/// cached for 5 minutes.
#[derive(Clone)]
pub struct BakeryClient {
    inner: Arc<BakeryClientInner>,
}

struct BakeryClientInner {
    client: reqwest::Client,
    base_url: Url,
    api_token: SecretString,
    cache: Cache<CacheKey, CacheValue>,
}

impl BakeryClient {
    /// Create a new bakery API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BakeryApiConfig) -> Result<Self, BakeryError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(BakeryClientInner {
                client,
                base_url: config.base_url.clone(),
                api_token: config.api_token.clone(),
                cache,
            }),
        })
    }

    fn url(&self, path: &str) -> Result<Url, BakeryError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.inner.api_token.expose_secret())
    }

    /// Issue a GET request and decode the JSON body.
    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, BakeryError> {
        let response = self
            .inner
            .client
            .get(url)
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await?;

        Self::decode(response).await
    }

    /// Issue a POST request with a JSON body and decode the JSON response.
    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, BakeryError> {
        let response = self
            .inner
            .client
            .post(url)
            .header(AUTHORIZATION, self.bearer())
            .json(body)
            .send()
            .await?;

        Self::decode(response).await
    }

    /// Check the status and decode the body.
    ///
    /// Non-success responses are classified by [`BakeryError::from_status`].
    /// An empty success body decodes as JSON `null`, so `()` targets work.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BakeryError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Bakery API returned non-success status"
            );
            return Err(BakeryError::from_status(status, &body));
        }

        let body = if body.trim().is_empty() { "null" } else { &body };
        serde_json::from_str(body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse bakery API response"
            );
            BakeryError::Parse(e)
        })
    }

    // =========================================================================
    // Catalog Methods (cached)
    // =========================================================================

    /// List all products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Arc<Vec<Product>>, BakeryError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products: Arc<Vec<Product>> = Arc::new(self.get(self.url("products")?).await?);
        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Arc<Product>, BakeryError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let product: Arc<Product> = Arc::new(self.get(self.url(&format!("products/{id}"))?).await?);
        self.inner
            .cache
            .insert(key, CacheValue::Product(product.clone()))
            .await;
        Ok(product)
    }

    /// Get the shopper-facing modifier groups of a product: only available
    /// options, groups and options ordered by display index.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn modifier_groups(
        &self,
        product_id: ProductId,
    ) -> Result<Arc<Vec<ModifierGroup>>, BakeryError> {
        let key = CacheKey::ModifierGroups(product_id);
        if let Some(CacheValue::ModifierGroups(groups)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for modifier groups");
            return Ok(groups);
        }

        let mut url = self.url(&format!("products/{product_id}/modifier-groups"))?;
        url.query_pairs_mut().append_pair("available_only", "true");
        let groups: Vec<ModifierGroup> = self.get(url).await?;

        let groups = Arc::new(customer_facing_groups(
            groups
                .into_iter()
                .filter(|g| g.product_id == product_id)
                .collect(),
        ));
        self.inner
            .cache
            .insert(key, CacheValue::ModifierGroups(groups.clone()))
            .await;
        Ok(groups)
    }

    /// List all locations.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_locations(&self) -> Result<Arc<Vec<Location>>, BakeryError> {
        if let Some(CacheValue::Locations(locations)) =
            self.inner.cache.get(&CacheKey::Locations).await
        {
            debug!("Cache hit for locations");
            return Ok(locations);
        }

        let locations: Arc<Vec<Location>> = Arc::new(self.get(self.url("locations")?).await?);
        self.inner
            .cache
            .insert(CacheKey::Locations, CacheValue::Locations(locations.clone()))
            .await;
        Ok(locations)
    }

    /// Get a location by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the location is not found or the API request fails.
    #[instrument(skip(self), fields(location_id = %id))]
    pub async fn get_location(&self, id: LocationId) -> Result<Arc<Location>, BakeryError> {
        let key = CacheKey::Location(id);
        if let Some(CacheValue::Location(location)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for location");
            return Ok(location);
        }

        let location: Arc<Location> =
            Arc::new(self.get(self.url(&format!("locations/{id}"))?).await?);
        self.inner
            .cache
            .insert(key, CacheValue::Location(location.clone()))
            .await;
        Ok(location)
    }

    // =========================================================================
    // Checkout Methods (not cached)
    // =========================================================================

    /// Validate a promo code against the current subtotal and location.
    ///
    /// # Errors
    ///
    /// Returns [`BakeryError::Rejected`] with the API's message when the code
    /// is refused, or another error if the request fails.
    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn validate_promo(
        &self,
        request: &PromoValidationRequest,
    ) -> Result<PromoValidation, BakeryError> {
        self.post(self.url("promo-codes/validate")?, request).await
    }

    /// Create an order record.
    ///
    /// # Errors
    ///
    /// Returns an error if the API refuses the order or the request fails.
    #[instrument(skip(self, request), fields(location_id = %request.location_id, lines = request.items.len()))]
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, BakeryError> {
        self.post(self.url("orders")?, request).await
    }

    /// Confirm payment for an existing order.
    ///
    /// Returns the updated order when the API echoes it back.
    ///
    /// # Errors
    ///
    /// Returns an error if the API refuses the confirmation or the request fails.
    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn confirm_payment(
        &self,
        order_id: OrderId,
        request: &ConfirmPaymentRequest,
    ) -> Result<Option<Order>, BakeryError> {
        let body: serde_json::Value = self
            .post(
                self.url(&format!("orders/{order_id}/confirm-payment"))?,
                request,
            )
            .await?;
        Ok(serde_json::from_value(body).ok())
    }

    /// Fetch the current state of an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is not found or the request fails.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, BakeryError> {
        self.get(self.url(&format!("orders/{order_id}"))?).await
    }

    /// Register a customer account.
    ///
    /// # Errors
    ///
    /// Returns an error if the API refuses the registration or the request fails.
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn register_account(
        &self,
        request: &RegisterAccountRequest,
    ) -> Result<(), BakeryError> {
        let _: serde_json::Value = self.post(self.url("auth/register")?, request).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::parse_base_url;

    fn client(base: &str) -> BakeryClient {
        BakeryClient::new(&BakeryApiConfig {
            base_url: parse_base_url(base).unwrap(),
            api_token: SecretString::from("bk_test_4Hq8vN2pL"),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_url_keeps_path_prefix() {
        let client = client("https://api.bakehouse.ie/v2");
        assert_eq!(
            client.url("/orders/7/confirm-payment").unwrap().as_str(),
            "https://api.bakehouse.ie/v2/orders/7/confirm-payment"
        );
        assert_eq!(
            client.url("products").unwrap().as_str(),
            "https://api.bakehouse.ie/v2/products"
        );
    }

    #[test]
    fn test_bearer_header() {
        let client = client("http://localhost:4000");
        assert_eq!(client.bearer(), "Bearer bk_test_4Hq8vN2pL");
    }
}
