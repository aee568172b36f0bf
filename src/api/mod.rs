//! REST API boundary.
//!
//! `StorefrontApi` is the seam between the storefront state and the backend.
//! `HttpApi` is the production implementation.
//!
//! # Wire contract
//!
//! - List endpoints answer `{ "items": [...] }`.
//! - Entity endpoints answer `{ "<entity>": {...} }` (`order`, `address`, `item`, ...).
//! - Payment intents answer `{ "success", "clientSecret", "paymentIntentId", "paymentId" }`.

mod cache;
mod http;

pub use http::HttpApi;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{CartLineItem, CreateOrder, Order};
use crate::{Address, NewAddress, NewReview, PaymentIntent, Product, Result, Review, WishlistItem};

/// Product listing filters. Persisted between sessions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ProductQuery {
    pub(crate) fn params(&self) -> Vec<(&'static str, &str)> {
        let mut params = Vec::new();
        if let Some(c) = self.category.as_deref().filter(|c| !c.is_empty()) { params.push(("category", c)); }
        if let Some(s) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) { params.push(("search", s)); }
        params
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItem {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntent {
    pub order_id: String,
    pub amount: Decimal,
    pub currency: String,
}

/// The single list envelope every collection endpoint uses.
#[derive(Debug, Deserialize)]
pub(crate) struct ListEnvelope<T> {
    pub items: Vec<T>,
}

#[async_trait]
pub trait StorefrontApi: Send + Sync {
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>>;
    async fn get_product(&self, product_id: &str) -> Result<Product>;

    async fn get_cart(&self) -> Result<Vec<CartLineItem>>;
    async fn add_cart_item(&self, item: &AddCartItem) -> Result<CartLineItem>;
    async fn update_cart_item(&self, line_id: &str, quantity: u32) -> Result<CartLineItem>;
    async fn remove_cart_item(&self, line_id: &str) -> Result<()>;
    async fn clear_cart(&self) -> Result<()>;

    async fn list_addresses(&self) -> Result<Vec<Address>>;
    async fn create_address(&self, address: &NewAddress) -> Result<Address>;

    async fn create_order(&self, order: &CreateOrder) -> Result<Order>;
    async fn list_orders(&self) -> Result<Vec<Order>>;
    async fn get_order(&self, order_id: &str) -> Result<Order>;
    async fn cancel_order(&self, order_id: &str) -> Result<Order>;
    async fn request_refund(&self, order_id: &str, reason: Option<&str>) -> Result<Order>;

    async fn create_payment_intent(&self, request: &CreatePaymentIntent) -> Result<PaymentIntent>;

    async fn list_reviews(&self, product_id: &str) -> Result<Vec<Review>>;
    async fn create_review(&self, review: &NewReview) -> Result<Review>;

    async fn list_wishlist(&self) -> Result<Vec<WishlistItem>>;
    async fn add_to_wishlist(&self, product_id: &str) -> Result<WishlistItem>;
    async fn remove_from_wishlist(&self, product_id: &str) -> Result<()>;

    /// Drops any cached responses, e.g. when the shopper logs out.
    async fn invalidate_all(&self) {}
}
