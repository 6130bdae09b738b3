//! Checkout form draft.

use serde::{Deserialize, Serialize};

/// What the shopper has typed into the checkout form so far.
///
/// Nothing here is validated; [`crate::services::checkout`] checks the
/// submitted values when the order is placed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
}

impl CheckoutDraft {
    /// Trim every field, dropping blank optional fields.
    #[must_use]
    pub fn normalized(self) -> Self {
        fn opt(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            delivery_address: opt(self.delivery_address),
            notes: opt(self.notes),
        }
    }

    /// Whether every field is blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }
}
