//! Integration tests for Bakehouse.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bakehouse-integration-tests
//! ```
//!
//! Each test starts two in-process servers on random local ports:
//!
//! - a [`FakeBakery`] standing in for the bakery REST API, recording every
//!   order, payment and registration call it receives
//! - the real storefront router, configured to talk to the fake
//!
//! and drives the storefront with a cookie-keeping `reqwest` client, so the
//! session cart behaves as it would in a browser.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;

use bakehouse_core::{
    Location, LocationId, ModifierGroup, ModifierGroupId, ModifierOption, ModifierOptionId,
    Product, ProductId, SelectionType,
};
use bakehouse_storefront::config::{BakeryApiConfig, CheckoutConfig, StorefrontConfig};
use bakehouse_storefront::state::AppState;

/// Token the fake bakery API accepts.
pub const API_TOKEN: &str = "bk_test_Zr8pQ2mW5xLn";

/// Euro cents as a `Decimal`.
#[must_use]
pub fn eur(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

// =============================================================================
// Fake Bakery API
// =============================================================================

/// In-memory bakery API.
#[derive(Clone, Default)]
pub struct FakeBakery {
    inner: Arc<FakeInner>,
}

#[derive(Default)]
struct FakeInner {
    products: Vec<Product>,
    groups: Vec<ModifierGroup>,
    locations: Vec<Location>,
    promos: HashMap<String, Decimal>,
    fail_modifiers: AtomicBool,
    fail_create: AtomicBool,
    fail_confirm: AtomicBool,
    fail_register: AtomicBool,
    next_order_id: AtomicI64,
    orders: Mutex<HashMap<i64, Value>>,
    created: Mutex<Vec<Value>>,
    confirmed: Mutex<Vec<(i64, Value)>>,
    registered: Mutex<Vec<Value>>,
}

impl FakeBakery {
    /// A small café menu.
    ///
    /// - Flat White (3.20): "Milk" single, required (Whole, Oat +0.40,
    ///   Soy unavailable); "Extras" multi, max 2 (Extra shot +0.50,
    ///   Vanilla +0.35, Caramel +0.35)
    /// - Sourdough Loaf (6.50), no modifiers
    /// - Seasonal Tart, unavailable
    /// - Quay Street: delivery and collection, delivery 3.50, free from
    ///   40.00, delivery minimum 15.00, 10% tax
    /// - Market Stall: collection only, 10% automatic discount, no tax
    /// - Promo `WELCOME5` worth 5.00
    #[must_use]
    pub fn with_menu() -> Self {
        let flat_white = ProductId::new(1);
        let milk = ModifierGroupId::new(10);
        let extras = ModifierGroupId::new(11);

        let option = |id: i64, group: ModifierGroupId, name: &str, cents: i64, available| {
            ModifierOption {
                id: ModifierOptionId::new(id),
                group_id: group,
                name: name.to_string(),
                price_adjustment: eur(cents),
                is_available: available,
                display_order: i32::try_from(id).unwrap(),
            }
        };

        let product = |id: i64, name: &str, cents: i64, available| Product {
            id: ProductId::new(id),
            name: name.to_string(),
            description: None,
            base_price: eur(cents),
            category_id: None,
            image_url: None,
            is_available: available,
        };

        let inner = FakeInner {
            products: vec![
                product(1, "Flat White", 320, true),
                product(2, "Sourdough Loaf", 650, true),
                product(3, "Seasonal Tart", 480, false),
            ],
            groups: vec![
                ModifierGroup {
                    id: extras,
                    product_id: flat_white,
                    name: "Extras".to_string(),
                    selection_type: SelectionType::Multi,
                    min_selections: 0,
                    max_selections: Some(2),
                    display_order: 2,
                    options: vec![
                        option(110, extras, "Extra shot", 50, true),
                        option(111, extras, "Vanilla", 35, true),
                        option(112, extras, "Caramel", 35, true),
                    ],
                },
                ModifierGroup {
                    id: milk,
                    product_id: flat_white,
                    name: "Milk".to_string(),
                    selection_type: SelectionType::Single,
                    min_selections: 1,
                    max_selections: None,
                    display_order: 1,
                    options: vec![
                        option(100, milk, "Whole", 0, true),
                        option(101, milk, "Oat", 40, true),
                        option(102, milk, "Soy", 30, false),
                    ],
                },
            ],
            locations: vec![
                Location {
                    id: LocationId::new(1),
                    name: "Quay Street".to_string(),
                    address: Some("4 Quay Street, Galway".to_string()),
                    delivery_enabled: true,
                    collection_enabled: true,
                    delivery_fee: eur(350),
                    free_delivery_threshold: Some(eur(4000)),
                    min_delivery_order: Some(eur(1500)),
                    tax_rate: Decimal::new(10, 2),
                    discount_percent: Decimal::ZERO,
                },
                Location {
                    id: LocationId::new(2),
                    name: "Market Stall".to_string(),
                    address: None,
                    delivery_enabled: false,
                    collection_enabled: true,
                    delivery_fee: Decimal::ZERO,
                    free_delivery_threshold: None,
                    min_delivery_order: None,
                    tax_rate: Decimal::ZERO,
                    discount_percent: Decimal::from(10),
                },
            ],
            promos: HashMap::from([("WELCOME5".to_string(), eur(500))]),
            next_order_id: AtomicI64::new(100),
            ..FakeInner::default()
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Make `GET /products/{id}/modifier-groups` fail with 503.
    pub fn fail_modifier_groups(&self) {
        self.inner.fail_modifiers.store(true, Ordering::SeqCst);
    }

    /// Make `POST /orders` fail with 422.
    pub fn fail_order_creation(&self) {
        self.inner.fail_create.store(true, Ordering::SeqCst);
    }

    /// Make `POST /orders/{id}/confirm-payment` fail with 500.
    pub fn fail_payment_confirmation(&self) {
        self.inner.fail_confirm.store(true, Ordering::SeqCst);
    }

    /// Make `POST /auth/register` fail with 409.
    pub fn fail_registration(&self) {
        self.inner.fail_register.store(true, Ordering::SeqCst);
    }

    /// Bodies of every `POST /orders` received.
    #[must_use]
    pub fn created_orders(&self) -> Vec<Value> {
        self.inner.created.lock().unwrap().clone()
    }

    /// Order ids and bodies of every payment confirmation received.
    #[must_use]
    pub fn confirmations(&self) -> Vec<(i64, Value)> {
        self.inner.confirmed.lock().unwrap().clone()
    }

    /// Bodies of every registration received.
    #[must_use]
    pub fn registrations(&self) -> Vec<Value> {
        self.inner.registered.lock().unwrap().clone()
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/products", get(list_products))
            .route("/products/{id}", get(get_product))
            .route("/products/{id}/modifier-groups", get(modifier_groups))
            .route("/locations", get(list_locations))
            .route("/locations/{id}", get(get_location))
            .route("/promo-codes/validate", post(validate_promo))
            .route("/orders", post(create_order))
            .route("/orders/{id}", get(get_order))
            .route("/orders/{id}/confirm-payment", post(confirm_payment))
            .route("/auth/register", post(register))
            .layer(axum::middleware::from_fn(require_token))
            .with_state(self.clone())
    }
}

fn api_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

async fn require_token(request: Request, next: Next) -> Response {
    let expected = format!("Bearer {API_TOKEN}");
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .is_some_and(|v| v.as_bytes() == expected.as_bytes());
    if !authorized {
        return api_error(StatusCode::UNAUTHORIZED, "Invalid token");
    }
    next.run(request).await
}

async fn list_products(State(fake): State<FakeBakery>) -> Json<Vec<Product>> {
    Json(fake.inner.products.clone())
}

async fn get_product(State(fake): State<FakeBakery>, Path(id): Path<i64>) -> Response {
    fake.inner
        .products
        .iter()
        .find(|p| p.id.as_i64() == id)
        .map_or_else(
            || api_error(StatusCode::NOT_FOUND, "Product not found"),
            |p| Json(p.clone()).into_response(),
        )
}

async fn modifier_groups(State(fake): State<FakeBakery>, Path(id): Path<i64>) -> Response {
    if fake.inner.fail_modifiers.load(Ordering::SeqCst) {
        return api_error(StatusCode::SERVICE_UNAVAILABLE, "Menu service unavailable");
    }

    // Unavailable options are returned too; the storefront filters them.
    let groups: Vec<ModifierGroup> = fake
        .inner
        .groups
        .iter()
        .filter(|g| g.product_id.as_i64() == id)
        .cloned()
        .collect();
    Json(groups).into_response()
}

async fn list_locations(State(fake): State<FakeBakery>) -> Json<Vec<Location>> {
    Json(fake.inner.locations.clone())
}

async fn get_location(State(fake): State<FakeBakery>, Path(id): Path<i64>) -> Response {
    fake.inner
        .locations
        .iter()
        .find(|l| l.id.as_i64() == id)
        .map_or_else(
            || api_error(StatusCode::NOT_FOUND, "Location not found"),
            |l| Json(l.clone()).into_response(),
        )
}

async fn validate_promo(State(fake): State<FakeBakery>, Json(body): Json<Value>) -> Response {
    let code = body["code"].as_str().unwrap_or_default();
    match fake.inner.promos.get(code) {
        Some(amount) => Json(json!({
            "valid": true,
            "code": code,
            "discount_amount": amount,
        }))
        .into_response(),
        None => api_error(StatusCode::UNPROCESSABLE_ENTITY, "Promo code not found"),
    }
}

async fn create_order(State(fake): State<FakeBakery>, Json(body): Json<Value>) -> Response {
    fake.inner.created.lock().unwrap().push(body.clone());
    if fake.inner.fail_create.load(Ordering::SeqCst) {
        return api_error(StatusCode::UNPROCESSABLE_ENTITY, "Kitchen is closed");
    }

    let id = fake.inner.next_order_id.fetch_add(1, Ordering::SeqCst);
    let order = json!({
        "id": id,
        "order_number": format!("BH-{id:04}"),
        "status": "pending",
        "payment_status": "pending",
        "fulfillment_method": body["fulfillment_method"],
        "total": body["totals"]["total"],
    });
    fake.inner.orders.lock().unwrap().insert(id, order.clone());
    (StatusCode::CREATED, Json(order)).into_response()
}

async fn get_order(State(fake): State<FakeBakery>, Path(id): Path<i64>) -> Response {
    fake.inner.orders.lock().unwrap().get(&id).cloned().map_or_else(
        || api_error(StatusCode::NOT_FOUND, "Order not found"),
        |o| Json(o).into_response(),
    )
}

async fn confirm_payment(
    State(fake): State<FakeBakery>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    fake.inner.confirmed.lock().unwrap().push((id, body));
    if fake.inner.fail_confirm.load(Ordering::SeqCst) {
        return api_error(StatusCode::INTERNAL_SERVER_ERROR, "Payment processor offline");
    }

    let mut orders = fake.inner.orders.lock().unwrap();
    let Some(order) = orders.get_mut(&id) else {
        return api_error(StatusCode::NOT_FOUND, "Order not found");
    };
    order["status"] = json!("confirmed");
    order["payment_status"] = json!("paid");
    Json(order.clone()).into_response()
}

async fn register(State(fake): State<FakeBakery>, Json(body): Json<Value>) -> Response {
    fake.inner.registered.lock().unwrap().push(body);
    if fake.inner.fail_register.load(Ordering::SeqCst) {
        return api_error(StatusCode::CONFLICT, "Email already registered");
    }
    (StatusCode::CREATED, Json(json!({ "id": 1 }))).into_response()
}

// =============================================================================
// Test Context
// =============================================================================

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

/// A running storefront wired to a fake bakery API.
pub struct TestContext {
    pub client: reqwest::Client,
    pub base_url: String,
    pub bakery: FakeBakery,
}

impl TestContext {
    /// Start with no payment confirmation delay.
    pub async fn start(bakery: FakeBakery) -> Self {
        Self::start_with_delay(bakery, Duration::ZERO).await
    }

    /// Start with the given simulated payment delay.
    pub async fn start_with_delay(bakery: FakeBakery, delay: Duration) -> Self {
        let bakery_addr = serve(bakery.router()).await;

        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            base_url: "http://127.0.0.1".to_string(),
            bakery: BakeryApiConfig {
                base_url: Url::parse(&format!("http://{bakery_addr}/")).unwrap(),
                api_token: SecretString::from(API_TOKEN),
                timeout: Duration::from_secs(5),
            },
            checkout: CheckoutConfig {
                payment_confirmation_delay: delay,
                ..CheckoutConfig::default()
            },
            sentry_dsn: None,
            sentry_environment: None,
        };

        let state = AppState::new(config).unwrap();
        let storefront_addr = serve(bakehouse_storefront::app(state)).await;

        Self {
            client: Self::new_client(),
            base_url: format!("http://{storefront_addr}"),
            bakery,
        }
    }

    /// A cookie-keeping client that does not follow redirects.
    #[must_use]
    pub fn new_client() -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client")
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &Value,
    ) -> reqwest::Response {
        self.client
            .request(method, self.url(path))
            .json(body)
            .send()
            .await
            .unwrap()
    }

    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.send(reqwest::Method::POST, path, body).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> reqwest::Response {
        self.send(reqwest::Method::PUT, path, body).await
    }

    /// Put a plain loaf and a customized flat white in the cart and choose
    /// `location_id` with `fulfillment`.
    pub async fn fill_cart(&self, location_id: i64, fulfillment: &str) {
        let resp = self
            .post("/cart/items", &json!({ "product_id": 2, "quantity": 2 }))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED.as_u16());

        let resp = self
            .post(
                "/cart/items",
                &json!({
                    "product_id": 1,
                    "selections": { "10": [101], "11": [110] },
                }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED.as_u16());

        let resp = self
            .put(
                "/cart/location",
                &json!({ "location_id": location_id, "fulfillment": fulfillment }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK.as_u16());
    }
}

/// A valid order submission body.
#[must_use]
pub fn order_body(payment: Value) -> Value {
    json!({
        "name": "Róisín Walsh",
        "email": "roisin@example.ie",
        "phone": "0861234567",
        "delivery_address": "12 Long Walk, Galway",
        "payment": payment,
    })
}

/// Parse a JSON decimal that may be a string or a number.
#[must_use]
pub fn dec(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}
