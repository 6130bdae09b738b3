//! Cache types for bakery API catalog responses.

use std::sync::Arc;

use bakehouse_core::{Location, LocationId, ModifierGroup, Product, ProductId};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products,
    Product(ProductId),
    ModifierGroups(ProductId),
    Locations,
    Location(LocationId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Arc<Vec<Product>>),
    Product(Arc<Product>),
    ModifierGroups(Arc<Vec<ModifierGroup>>),
    Locations(Arc<Vec<Location>>),
    Location(Arc<Location>),
}
