//! Product model.
//!
//! [`Product`] is the authoritative record kept by the relational store.
//! [`ProductDocument`] is its denormalized mirror in the search index, keyed
//! by the decimal string form of the product id.
//!
//! ```rust
//! use shelf_core::product::NewProduct;
//!
//! let new = NewProduct::new("iPhone 15", 1200, "phones")
//!     .description("Latest model")
//!     .rating(4.8);
//! assert!(new.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier assigned by the relational store on insert.
pub type ProductId = i64;

/// Lowest allowed rating.
pub const MIN_RATING: f64 = 0.0;

/// Highest allowed rating.
pub const MAX_RATING: f64 = 5.0;

/// A persisted product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Store-assigned identifier.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Long-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Price in the currency's minor unit.
    pub price: i64,
    /// Average rating in `[0.0, 5.0]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Free-form category label.
    pub category: String,
}

impl Product {
    /// Attach a store-assigned id to a validated input.
    pub fn from_new(id: ProductId, new: NewProduct) -> Self {
        Self {
            id,
            name: new.name,
            description: new.description,
            price: new.price,
            rating: new.rating,
            category: new.category,
        }
    }

    /// Build the search-index mirror of this product.
    pub fn to_document(&self) -> ProductDocument {
        ProductDocument::from(self)
    }
}

/// Input for creating a product. Has no id yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    /// Display name (required).
    pub name: String,
    /// Long-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Price in the currency's minor unit.
    pub price: i64,
    /// Average rating in `[0.0, 5.0]`.
    #[serde(default)]
    pub rating: Option<f64>,
    /// Free-form category label.
    #[serde(default)]
    pub category: String,
}

impl NewProduct {
    /// Create an input with the required attributes.
    pub fn new(name: impl Into<String>, price: i64, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            price,
            rating: None,
            category: category.into(),
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the rating.
    pub fn rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Check the product invariants.
    ///
    /// The name must contain a non-whitespace character, the price must not
    /// be negative, and a rating, when present, must be finite and in range.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation_field("name", "must not be empty"));
        }
        if self.price < 0 {
            return Err(Error::validation_field(
                "price",
                format!("must not be negative (got {})", self.price),
            ));
        }
        if let Some(rating) = self.rating
            && !(rating.is_finite() && (MIN_RATING..=MAX_RATING).contains(&rating))
        {
            return Err(Error::validation_field(
                "rating",
                format!("must be between {MIN_RATING} and {MAX_RATING} (got {rating})"),
            ));
        }
        Ok(())
    }
}

/// Convert a product id to the search-index document id.
pub fn document_id(id: ProductId) -> String {
    id.to_string()
}

/// Denormalized product record held by the search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDocument {
    /// Decimal string form of the product id.
    pub id: String,
    /// Display name; search results may carry a highlighted variant.
    pub name: String,
    /// Long-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Price in the currency's minor unit.
    pub price: i64,
    /// Average rating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Free-form category label.
    pub category: String,
}

impl From<&Product> for ProductDocument {
    fn from(product: &Product) -> Self {
        Self {
            id: document_id(product.id),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            rating: product.rating,
            category: product.category.clone(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
