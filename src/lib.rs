//! OpenSASE Storefront
//!
//! Client-side core of the OpenSASE storefront, consuming the e-commerce REST API.
//!
//! ## Features
//! - Discount offer evaluation for product listings
//! - Shopping cart with optimistic updates and server re-sync
//! - Checkout selections and order totals
//! - Order placement (cash on delivery and card payment intents)
//! - Order history, reviews, wishlist and saved addresses

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

pub mod api;
pub mod config;
pub mod domain;
pub mod placement;
pub mod storage;
pub mod storefront;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, StorefrontConfig};
pub use domain::aggregates::{
    Cart, CartError, CartLineItem, CheckoutIssue, CheckoutSelection, CheckoutTotals, DeliveryOption,
    DiscountOffer, DiscountType, OfferCatalog, Order, OrderStatus, PaymentMethod, SyncState,
};
pub use domain::events::{Route, StorefrontEvent};
pub use domain::value_objects::Money;
pub use placement::{PlacementOutcome, PlacementState};
pub use storefront::Storefront;

// =============================================================================
// Core Types
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default)]
    pub rating: Option<f32>,
}

/// Copy of the product fields a cart line keeps. Not a live reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub images: Vec<String>,
}

impl From<&Product> for ProductSnapshot {
    fn from(p: &Product) -> Self {
        Self { id: p.id.clone(), name: p.name.clone(), price: p.price, images: p.images.clone() }
    }
}

/// A product as shown on a listing page, with the best offer applied.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductListing {
    pub product: Product,
    pub display_price: Decimal,
    pub offer_id: Option<String>,
}

impl ProductListing {
    pub fn is_discounted(&self) -> bool { self.display_price < self.product.price }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: String,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    pub country: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    #[validate(length(min = 7, max = 20))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub street: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    pub state: Option<String>,
    #[validate(length(min = 2, max = 60))]
    pub country: String,
    pub postal_code: Option<String>,
    pub is_default: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub product_id: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    #[validate(length(min = 1))]
    pub product_id: String,
    #[validate(range(min = 1, max = 5))]
    pub rating: u8,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub id: String,
    pub product_id: String,
    #[serde(default)]
    pub product: Option<Product>,
}

/// Server-issued payment intent, handed to the card payment form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub client_secret: String,
    pub payment_intent_id: String,
    pub payment_id: String,
}

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Checkout incomplete: {}", format_issues(.0))]
    Validation(Vec<CheckoutIssue>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Order total {amount} is below the minimum card charge of {minimum}")]
    BelowMinimumCharge { amount: Decimal, minimum: Decimal },

    #[error("An order is already being placed")]
    PlacementInProgress,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("JSON parse error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl StorefrontError {
    /// Errors raised before any request leaves the client.
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::InvalidInput(_) | Self::BelowMinimumCharge { .. } | Self::PlacementInProgress
        )
    }
}

impl From<validator::ValidationErrors> for StorefrontError {
    fn from(e: validator::ValidationErrors) -> Self { Self::InvalidInput(e.to_string()) }
}

fn format_issues(issues: &[CheckoutIssue]) -> String {
    issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
