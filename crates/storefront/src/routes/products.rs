//! Product and modifier route handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bakehouse_core::{
    CategoryId, ChosenCustomization, ModifierGroup, ModifierGroupId, ModifierOptionId, Product,
    ProductId, resolve,
};

use crate::error::Result;
use crate::state::AppState;

/// Product listing filters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category_id: Option<CategoryId>,
    /// Hide products that cannot be ordered right now.
    #[serde(default)]
    pub available_only: bool,
}

/// Shopper-submitted modifier choices: group id to option ids, in click order.
pub type Selections = BTreeMap<ModifierGroupId, Vec<ModifierOptionId>>;

/// Body of a selection preview.
#[derive(Debug, Default, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub selections: Selections,
}

/// Price and completeness of a product with the given selections.
#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub customizations: Vec<ChosenCustomization>,
    pub price_delta: Decimal,
    pub unit_price: Decimal,
    /// Names of groups that still need a choice.
    pub missing_required: Vec<String>,
}

/// List products.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    let products = state.bakery().list_products().await?;

    let products = products
        .iter()
        .filter(|p| !query.available_only || p.is_available)
        .filter(|p| query.category_id.is_none_or(|c| p.category_id == Some(c)))
        .cloned()
        .collect();

    Ok(Json(products))
}

/// Show one product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = state.bakery().get_product(id).await?;
    Ok(Json(Product::clone(&product)))
}

/// List the customer-facing modifier groups of a product.
#[instrument(skip(state))]
pub async fn modifiers(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Json<Vec<ModifierGroup>> {
    Json(customer_groups(&state, id).await.to_vec())
}

/// Replay selections against a product's modifier groups.
#[instrument(skip(state, request))]
pub async fn preview(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>> {
    let product = state.bakery().get_product(id).await?;
    let groups = customer_groups(&state, id).await;
    let resolved = resolve(&groups, &request.selections)?;

    Ok(Json(PreviewResponse {
        unit_price: (product.base_price + resolved.price_delta).max(Decimal::ZERO),
        customizations: resolved.customizations,
        price_delta: resolved.price_delta,
        missing_required: resolved.missing_required,
    }))
}

/// Modifier groups for a product; an empty list if they cannot be fetched.
pub(crate) async fn customer_groups(state: &AppState, id: ProductId) -> Arc<Vec<ModifierGroup>> {
    match state.bakery().modifier_groups(id).await {
        Ok(groups) => groups,
        Err(e) => {
            tracing::warn!(product_id = %id, error = %e, "Failed to load modifier groups");
            Arc::new(Vec::new())
        }
    }
}
