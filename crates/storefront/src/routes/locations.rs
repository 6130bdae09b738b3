//! Location route handlers.

use axum::{Json, extract::State};
use tracing::instrument;

use bakehouse_core::Location;

use crate::error::Result;
use crate::state::AppState;

/// List locations.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Location>>> {
    let locations = state.bakery().list_locations().await?;
    Ok(Json(locations.to_vec()))
}
