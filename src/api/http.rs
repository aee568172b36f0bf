//! `reqwest` implementation of the storefront API.
//!
//! GET responses are cached with `moka` for the configured TTL. Mutations
//! invalidate the keys whose data they change.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::cache::{CacheKey, CacheValue};
use super::{AddCartItem, CreatePaymentIntent, ListEnvelope, ProductQuery, StorefrontApi};
use crate::config::StorefrontConfig;
use crate::domain::aggregates::{CartLineItem, CreateOrder, Order};
use crate::{Address, NewAddress, NewReview, PaymentIntent, Product, Result, Review, StorefrontError, WishlistItem};

#[derive(Clone)]
pub struct HttpApi {
    inner: Arc<HttpApiInner>,
}

struct HttpApiInner {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    cache: Cache<CacheKey, CacheValue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentIntentResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    intent: Option<PaymentIntent>,
}

impl HttpApi {
    pub fn new(config: &StorefrontConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.http_timeout {
            builder = builder.timeout(timeout);
        }
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(HttpApiInner {
                client: builder.build()?,
                base_url: config.api_url.trim_end_matches('/').to_string(),
                token: config.api_token.clone(),
                cache,
            }),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.inner.client.request(method, format!("{}{path}", self.inner.base_url));
        match &self.inner.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value> {
        let response = builder.send().await?;
        let status = response.status();
        let path = response.url().path().to_string();
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(StorefrontError::NotFound(path));
        }
        if !status.is_success() {
            tracing::error!(
                status = %status,
                path = %path,
                body = %body.chars().take(500).collect::<String>(),
                "Storefront API returned non-success status"
            );
            return Err(StorefrontError::Api { status: status.as_u16(), message: error_message(&body) });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, path = %path, "Failed to parse Storefront API response");
            StorefrontError::Decode(e)
        })
    }

    async fn fetch_list<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<Vec<T>> {
        let body = self.send(builder).await?;
        Ok(serde_json::from_value::<ListEnvelope<T>>(body)?.items)
    }

    async fn fetch_entity<T: DeserializeOwned>(&self, builder: RequestBuilder, key: &'static str) -> Result<T> {
        let body = self.send(builder).await?;
        entity(body, key)
    }

    async fn cached<T, F>(&self, key: CacheKey, fetch: F, wrap: fn(T) -> CacheValue, unwrap: fn(CacheValue) -> Option<T>) -> Result<T>
    where
        T: Clone,
        F: Future<Output = Result<T>>,
    {
        if let Some(hit) = self.inner.cache.get(&key).await.and_then(unwrap) {
            debug!(?key, "cache hit");
            return Ok(hit);
        }
        let value = fetch.await?;
        self.inner.cache.insert(key, wrap(value.clone())).await;
        Ok(value)
    }

    async fn invalidate(&self, keys: impl IntoIterator<Item = CacheKey>) {
        for key in keys {
            self.inner.cache.invalidate(&key).await;
        }
    }
}

fn entity<T: DeserializeOwned>(mut body: Value, key: &'static str) -> Result<T> {
    match body.get_mut(key).map(Value::take) {
        Some(value) if !value.is_null() => Ok(serde_json::from_value(value)?),
        _ => Err(StorefrontError::Decode(serde::de::Error::missing_field(key))),
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").or_else(|| v.get("error")).and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[async_trait]
impl StorefrontApi for HttpApi {
    #[instrument(skip(self))]
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let builder = self.request(Method::GET, "/products").query(&query.params());
        self.cached(CacheKey::Products(query.clone()), self.fetch_list(builder), CacheValue::Products, |v| match v {
            CacheValue::Products(p) => Some(p),
            _ => None,
        })
        .await
    }

    #[instrument(skip(self))]
    async fn get_product(&self, product_id: &str) -> Result<Product> {
        let builder = self.request(Method::GET, &format!("/products/{product_id}"));
        self.cached(
            CacheKey::Product(product_id.to_string()),
            self.fetch_entity(builder, "product"),
            |p| CacheValue::Product(Box::new(p)),
            |v| match v {
                CacheValue::Product(p) => Some(*p),
                _ => None,
            },
        )
        .await
    }

    #[instrument(skip(self))]
    async fn get_cart(&self) -> Result<Vec<CartLineItem>> {
        self.fetch_list(self.request(Method::GET, "/cart")).await
    }

    #[instrument(skip(self))]
    async fn add_cart_item(&self, item: &AddCartItem) -> Result<CartLineItem> {
        self.fetch_entity(self.request(Method::POST, "/cart").json(item), "item").await
    }

    #[instrument(skip(self))]
    async fn update_cart_item(&self, line_id: &str, quantity: u32) -> Result<CartLineItem> {
        let builder = self.request(Method::PATCH, &format!("/cart/{line_id}")).json(&json!({ "quantity": quantity }));
        self.fetch_entity(builder, "item").await
    }

    #[instrument(skip(self))]
    async fn remove_cart_item(&self, line_id: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, &format!("/cart/{line_id}"))).await.map(drop)
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<()> {
        self.send(self.request(Method::DELETE, "/cart")).await.map(drop)
    }

    #[instrument(skip(self))]
    async fn list_addresses(&self) -> Result<Vec<Address>> {
        let builder = self.request(Method::GET, "/addresses");
        self.cached(CacheKey::Addresses, self.fetch_list(builder), CacheValue::Addresses, |v| match v {
            CacheValue::Addresses(a) => Some(a),
            _ => None,
        })
        .await
    }

    #[instrument(skip(self, address))]
    async fn create_address(&self, address: &NewAddress) -> Result<Address> {
        let created = self.fetch_entity(self.request(Method::POST, "/addresses").json(address), "address").await?;
        self.invalidate([CacheKey::Addresses]).await;
        Ok(created)
    }

    #[instrument(skip(self, order))]
    async fn create_order(&self, order: &CreateOrder) -> Result<Order> {
        let created = self.fetch_entity(self.request(Method::POST, "/orders").json(order), "order").await?;
        self.invalidate([CacheKey::Orders]).await;
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn list_orders(&self) -> Result<Vec<Order>> {
        let builder = self.request(Method::GET, "/orders");
        self.cached(CacheKey::Orders, self.fetch_list(builder), CacheValue::Orders, |v| match v {
            CacheValue::Orders(o) => Some(o),
            _ => None,
        })
        .await
    }

    #[instrument(skip(self))]
    async fn get_order(&self, order_id: &str) -> Result<Order> {
        let builder = self.request(Method::GET, &format!("/orders/{order_id}"));
        self.cached(
            CacheKey::Order(order_id.to_string()),
            self.fetch_entity(builder, "order"),
            |o| CacheValue::Order(Box::new(o)),
            |v| match v {
                CacheValue::Order(o) => Some(*o),
                _ => None,
            },
        )
        .await
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, order_id: &str) -> Result<Order> {
        let order = self.fetch_entity(self.request(Method::POST, &format!("/orders/{order_id}/cancel")), "order").await?;
        self.invalidate([CacheKey::Orders, CacheKey::Order(order_id.to_string())]).await;
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn request_refund(&self, order_id: &str, reason: Option<&str>) -> Result<Order> {
        let builder = self.request(Method::POST, &format!("/orders/{order_id}/refund")).json(&json!({ "reason": reason }));
        let order = self.fetch_entity(builder, "order").await?;
        self.invalidate([CacheKey::Orders, CacheKey::Order(order_id.to_string())]).await;
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn create_payment_intent(&self, request: &CreatePaymentIntent) -> Result<PaymentIntent> {
        let body = self.send(self.request(Method::POST, "/payments/create-intent").json(request)).await?;
        let response: PaymentIntentResponse = serde_json::from_value(body)?;
        match response {
            PaymentIntentResponse { success: true, intent: Some(intent), .. } => Ok(intent),
            PaymentIntentResponse { message, .. } => Err(StorefrontError::Api {
                status: StatusCode::OK.as_u16(),
                message: message.unwrap_or_else(|| "payment intent was not created".to_string()),
            }),
        }
    }

    #[instrument(skip(self))]
    async fn list_reviews(&self, product_id: &str) -> Result<Vec<Review>> {
        let builder = self.request(Method::GET, "/reviews").query(&[("productId", product_id)]);
        self.cached(CacheKey::Reviews(product_id.to_string()), self.fetch_list(builder), CacheValue::Reviews, |v| match v {
            CacheValue::Reviews(r) => Some(r),
            _ => None,
        })
        .await
    }

    #[instrument(skip(self, review))]
    async fn create_review(&self, review: &NewReview) -> Result<Review> {
        let created = self.fetch_entity(self.request(Method::POST, "/reviews").json(review), "review").await?;
        self.invalidate([CacheKey::Reviews(review.product_id.clone()), CacheKey::Product(review.product_id.clone())]).await;
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn list_wishlist(&self) -> Result<Vec<WishlistItem>> {
        let builder = self.request(Method::GET, "/wishlist");
        self.cached(CacheKey::Wishlist, self.fetch_list(builder), CacheValue::Wishlist, |v| match v {
            CacheValue::Wishlist(w) => Some(w),
            _ => None,
        })
        .await
    }

    #[instrument(skip(self))]
    async fn add_to_wishlist(&self, product_id: &str) -> Result<WishlistItem> {
        let builder = self.request(Method::POST, "/wishlist").json(&json!({ "productId": product_id }));
        let item = self.fetch_entity(builder, "item").await?;
        self.invalidate([CacheKey::Wishlist]).await;
        Ok(item)
    }

    #[instrument(skip(self))]
    async fn remove_from_wishlist(&self, product_id: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, &format!("/wishlist/{product_id}"))).await?;
        self.invalidate([CacheKey::Wishlist]).await;
        Ok(())
    }

    async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        debug!("response cache cleared");
    }
}
