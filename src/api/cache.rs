//! Cache types for API responses.

use crate::api::ProductQuery;
use crate::domain::aggregates::Order;
use crate::{Address, Product, Review, WishlistItem};

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products(ProductQuery),
    Product(String),
    Addresses,
    Orders,
    Order(String),
    Reviews(String),
    Wishlist,
}

#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Vec<Product>),
    Product(Box<Product>),
    Addresses(Vec<Address>),
    Orders(Vec<Order>),
    Order(Box<Order>),
    Reviews(Vec<Review>),
    Wishlist(Vec<WishlistItem>),
}
