//! In-memory backend for exercising the storefront without a server.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use crate::api::{AddCartItem, CreatePaymentIntent, ProductQuery, StorefrontApi};
use crate::domain::aggregates::{CartLineItem, CreateOrder, Order, OrderItem, OrderStatus, SyncState};
use crate::{Address, NewAddress, NewReview, PaymentIntent, Product, ProductSnapshot, Result, Review, StorefrontError, WishlistItem};

#[derive(Default)]
pub(crate) struct MockApi {
    pub products: Vec<Product>,
    pub cart: Mutex<Vec<CartLineItem>>,
    pub addresses: Mutex<Vec<Address>>,
    pub orders: Mutex<Vec<Order>>,
    pub reviews: Mutex<Vec<Review>>,
    pub wishlist: Mutex<Vec<WishlistItem>>,
    pub created_orders: Mutex<Vec<CreateOrder>>,
    pub intents: Mutex<Vec<CreatePaymentIntent>>,
    calls: Mutex<Vec<&'static str>>,
    failing: Mutex<HashSet<&'static str>>,
    next_id: AtomicUsize,
}

pub(crate) fn product(id: &str, price: i64) -> Product {
    Product {
        id: id.into(),
        name: format!("Product {id}"),
        description: None,
        price: Decimal::new(price, 0),
        images: vec![format!("https://cdn.example.ng/{id}.jpg")],
        category: Some("general".into()),
        stock: Some(10),
        rating: None,
    }
}

pub(crate) fn address(id: &str) -> Address {
    Address {
        id: id.into(),
        full_name: "Ada Obi".into(),
        street: "1 Marina Road".into(),
        city: "Lagos".into(),
        country: "NG".into(),
        ..Default::default()
    }
}

impl MockApi {
    pub fn with_products(products: Vec<Product>) -> Self {
        Self { products, ..Default::default() }
    }

    pub fn fail(&self, endpoint: &'static str) { self.failing.lock().unwrap().insert(endpoint); }
    pub fn recover(&self, endpoint: &'static str) { self.failing.lock().unwrap().remove(endpoint); }
    pub fn calls(&self) -> Vec<&'static str> { self.calls.lock().unwrap().clone() }
    pub fn count(&self, endpoint: &str) -> usize { self.calls().iter().filter(|c| **c == endpoint).count() }

    fn record(&self, endpoint: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(endpoint);
        if self.failing.lock().unwrap().contains(endpoint) {
            return Err(StorefrontError::Api { status: 503, message: format!("{endpoint} unavailable") });
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String { format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1) }

    fn snapshot(&self, product_id: &str) -> ProductSnapshot {
        self.products
            .iter()
            .find(|p| p.id == product_id)
            .map(ProductSnapshot::from)
            .unwrap_or_else(|| ProductSnapshot::from(&product(product_id, 0)))
    }

    fn find_order(&self, order_id: &str) -> Result<Order> {
        self.orders.lock().unwrap().iter().find(|o| o.id == order_id).cloned().ok_or_else(|| StorefrontError::NotFound(order_id.into()))
    }

    fn set_status(&self, order_id: &str, status: OrderStatus) -> Result<Order> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders.iter_mut().find(|o| o.id == order_id).ok_or_else(|| StorefrontError::NotFound(order_id.into()))?;
        order.status = status;
        Ok(order.clone())
    }
}

#[async_trait]
impl StorefrontApi for MockApi {
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        self.record("list_products")?;
        let search = query.search.as_deref().map(str::to_lowercase);
        Ok(self
            .products
            .iter()
            .filter(|p| query.category.is_none() || p.category == query.category)
            .filter(|p| search.as_deref().map_or(true, |s| p.name.to_lowercase().contains(s)))
            .cloned()
            .collect())
    }

    async fn get_product(&self, product_id: &str) -> Result<Product> {
        self.record("get_product")?;
        self.products.iter().find(|p| p.id == product_id).cloned().ok_or_else(|| StorefrontError::NotFound(product_id.into()))
    }

    async fn get_cart(&self) -> Result<Vec<CartLineItem>> {
        self.record("get_cart")?;
        Ok(self.cart.lock().unwrap().clone())
    }

    async fn add_cart_item(&self, item: &AddCartItem) -> Result<CartLineItem> {
        self.record("add_cart_item")?;
        let mut cart = self.cart.lock().unwrap();
        if let Some(line) = cart.iter_mut().find(|l| l.product_id == item.product_id) {
            line.quantity += item.quantity;
            return Ok(line.clone());
        }
        let line = CartLineItem {
            id: self.next_id("line"),
            product_id: item.product_id.clone(),
            quantity: item.quantity,
            product: self.snapshot(&item.product_id),
            sync: SyncState::Confirmed,
        };
        cart.push(line.clone());
        Ok(line)
    }

    async fn update_cart_item(&self, line_id: &str, quantity: u32) -> Result<CartLineItem> {
        self.record("update_cart_item")?;
        let mut cart = self.cart.lock().unwrap();
        let line = cart.iter_mut().find(|l| l.id == line_id).ok_or_else(|| StorefrontError::NotFound(line_id.into()))?;
        line.quantity = quantity;
        Ok(line.clone())
    }

    async fn remove_cart_item(&self, line_id: &str) -> Result<()> {
        self.record("remove_cart_item")?;
        self.cart.lock().unwrap().retain(|l| l.id != line_id);
        Ok(())
    }

    async fn clear_cart(&self) -> Result<()> {
        self.record("clear_cart")?;
        self.cart.lock().unwrap().clear();
        Ok(())
    }

    async fn list_addresses(&self) -> Result<Vec<Address>> {
        self.record("list_addresses")?;
        Ok(self.addresses.lock().unwrap().clone())
    }

    async fn create_address(&self, new: &NewAddress) -> Result<Address> {
        self.record("create_address")?;
        let created = Address {
            id: self.next_id("addr"),
            full_name: new.full_name.clone(),
            phone: new.phone.clone(),
            street: new.street.clone(),
            city: new.city.clone(),
            state: new.state.clone(),
            country: new.country.clone(),
            postal_code: new.postal_code.clone(),
            is_default: new.is_default,
        };
        self.addresses.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn create_order(&self, request: &CreateOrder) -> Result<Order> {
        self.record("create_order")?;
        self.created_orders.lock().unwrap().push(request.clone());
        let items: Vec<OrderItem> = request
            .items
            .iter()
            .map(|i| OrderItem {
                product_id: i.product_id.clone(),
                name: self.snapshot(&i.product_id).name,
                quantity: i.quantity,
                unit_price: i.price,
                total: i.price * Decimal::from(i.quantity),
            })
            .collect();
        let subtotal: Decimal = items.iter().map(|i| i.total).sum();
        let id = self.next_id("ord");
        let order = Order {
            order_number: format!("ORD-{id}"),
            id,
            status: OrderStatus::Pending,
            items,
            shipping_address: self.addresses.lock().unwrap().iter().find(|a| a.id == request.shipping_address_id).cloned(),
            billing_address: None,
            payments: vec![],
            subtotal,
            shipping_amount: request.shipping_amount,
            tax_amount: request.tax_amount,
            total: subtotal + request.shipping_amount + request.tax_amount,
            payment_method: Some(request.payment_method),
            notes: request.notes.clone(),
            created_at: Some(Utc::now()),
        };
        self.orders.lock().unwrap().push(order.clone());
        Ok(order)
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        self.record("list_orders")?;
        Ok(self.orders.lock().unwrap().clone())
    }

    async fn get_order(&self, order_id: &str) -> Result<Order> {
        self.record("get_order")?;
        self.find_order(order_id)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<Order> {
        self.record("cancel_order")?;
        self.set_status(order_id, OrderStatus::Cancelled)
    }

    async fn request_refund(&self, order_id: &str, _reason: Option<&str>) -> Result<Order> {
        self.record("request_refund")?;
        self.set_status(order_id, OrderStatus::Refunded)
    }

    async fn create_payment_intent(&self, request: &CreatePaymentIntent) -> Result<PaymentIntent> {
        self.record("create_payment_intent")?;
        self.intents.lock().unwrap().push(request.clone());
        let id = self.next_id("pi");
        Ok(PaymentIntent { client_secret: format!("{id}_secret"), payment_intent_id: id, payment_id: self.next_id("pay") })
    }

    async fn list_reviews(&self, product_id: &str) -> Result<Vec<Review>> {
        self.record("list_reviews")?;
        Ok(self.reviews.lock().unwrap().iter().filter(|r| r.product_id == product_id).cloned().collect())
    }

    async fn create_review(&self, new: &NewReview) -> Result<Review> {
        self.record("create_review")?;
        let review = Review {
            id: self.next_id("rev"),
            product_id: new.product_id.clone(),
            rating: new.rating,
            comment: new.comment.clone(),
            author: Some("Ada Obi".into()),
            created_at: Utc::now(),
        };
        self.reviews.lock().unwrap().push(review.clone());
        Ok(review)
    }

    async fn list_wishlist(&self) -> Result<Vec<WishlistItem>> {
        self.record("list_wishlist")?;
        Ok(self.wishlist.lock().unwrap().clone())
    }

    async fn add_to_wishlist(&self, product_id: &str) -> Result<WishlistItem> {
        self.record("add_to_wishlist")?;
        let item = WishlistItem {
            id: self.next_id("wish"),
            product_id: product_id.into(),
            product: self.products.iter().find(|p| p.id == product_id).cloned(),
        };
        self.wishlist.lock().unwrap().push(item.clone());
        Ok(item)
    }

    async fn remove_from_wishlist(&self, product_id: &str) -> Result<()> {
        self.record("remove_from_wishlist")?;
        self.wishlist.lock().unwrap().retain(|w| w.product_id != product_id);
        Ok(())
    }

    async fn invalidate_all(&self) { self.calls.lock().unwrap().push("invalidate_all"); }
}
