//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{Money, DEFAULT_CURRENCY};
use crate::ProductSnapshot;

const LOCAL_ID_PREFIX: &str = "local-";

/// Where a line stands relative to the server's copy of the cart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Changed locally, request not yet answered.
    Optimistic,
    #[default]
    Confirmed,
    /// The request failed; waiting for the server copy to replace it.
    Reverting,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub id: String,
    pub product_id: String,
    pub quantity: u32,
    pub product: ProductSnapshot,
    #[serde(default)]
    pub sync: SyncState,
}

impl CartLineItem {
    pub fn unit_price(&self) -> Decimal { self.product.price }
    pub fn line_total(&self) -> Decimal { self.product.price * Decimal::from(self.quantity) }
    pub fn is_local(&self) -> bool { self.id.starts_with(LOCAL_ID_PREFIX) }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    items: Vec<CartLineItem>,
    currency: String,
    updated_at: DateTime<Utc>,
}

impl Default for Cart { fn default() -> Self { Self::new(DEFAULT_CURRENCY) } }

impl Cart {
    pub fn new(currency: &str) -> Self {
        Self { items: vec![], currency: currency.to_string(), updated_at: Utc::now() }
    }

    pub fn items(&self) -> &[CartLineItem] { &self.items }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn line_count(&self) -> usize { self.items.len() }
    pub fn line(&self, line_id: &str) -> Option<&CartLineItem> { self.items.iter().find(|i| i.id == line_id) }
    pub fn line_for_product(&self, product_id: &str) -> Option<&CartLineItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }
    pub fn has_pending_changes(&self) -> bool { self.items.iter().any(|i| i.sync != SyncState::Confirmed) }

    /// Sum of quantities, recomputed on every read.
    pub fn total_items(&self) -> u32 { self.items.iter().map(|i| i.quantity).sum() }

    /// Sum of quantity times raw unit price. Offers are not applied here.
    pub fn total_price(&self) -> Money {
        Money::new(self.items.iter().map(CartLineItem::line_total).sum(), &self.currency)
    }

    /// Adds `quantity` of a product ahead of the server, merging into an existing line.
    /// Returns the id of the line that was touched.
    pub fn add_optimistic(&mut self, product: ProductSnapshot, quantity: u32) -> Result<String, CartError> {
        if quantity == 0 { return Err(CartError::InvalidQuantity); }
        let id = if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            existing.quantity += quantity;
            existing.sync = SyncState::Optimistic;
            existing.id.clone()
        } else {
            let id = format!("{LOCAL_ID_PREFIX}{}", Uuid::new_v4());
            self.items.push(CartLineItem {
                id: id.clone(),
                product_id: product.id.clone(),
                quantity,
                product,
                sync: SyncState::Optimistic,
            });
            id
        };
        self.touch();
        Ok(id)
    }

    /// Sets a line's quantity; zero removes the line.
    pub fn update_quantity(&mut self, line_id: &str, quantity: u32) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| i.id == line_id).ok_or_else(|| CartError::ItemNotFound(line_id.to_string()))?;
        if quantity == 0 { self.items.retain(|i| i.id != line_id); }
        else { item.quantity = quantity; item.sync = SyncState::Optimistic; }
        self.touch();
        Ok(())
    }

    pub fn remove(&mut self, line_id: &str) -> Result<CartLineItem, CartError> {
        let pos = self.items.iter().position(|i| i.id == line_id).ok_or_else(|| CartError::ItemNotFound(line_id.to_string()))?;
        let removed = self.items.remove(pos);
        self.touch();
        Ok(removed)
    }

    pub fn clear(&mut self) { self.items.clear(); self.touch(); }

    /// Replaces the line `line_id` with the server's record of it.
    pub fn confirm_line(&mut self, line_id: &str, mut server: CartLineItem) {
        server.sync = SyncState::Confirmed;
        // the server may have folded the add into a line it already knew about
        self.items.retain(|i| i.id == line_id || i.id != server.id);
        match self.items.iter_mut().find(|i| i.id == line_id) {
            Some(item) => *item = server,
            None => self.items.push(server),
        }
        self.touch();
    }

    pub fn mark_reverting(&mut self, line_id: &str) {
        if let Some(item) = self.items.iter_mut().find(|i| i.id == line_id) {
            item.sync = SyncState::Reverting;
            self.touch();
        }
    }

    /// Drops local state in favour of the server's cart.
    pub fn replace_with(&mut self, server_items: Vec<CartLineItem>) {
        self.items = server_items
            .into_iter()
            .filter(|i| i.quantity > 0)
            .map(|mut i| { i.sync = SyncState::Confirmed; i })
            .collect();
        self.touch();
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ItemNotFound(String), InvalidQuantity }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound(id) => write!(f, "Item not found: {id}"),
            Self::InvalidQuantity => write!(f, "Quantity must be at least 1"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: &str, price: i64) -> ProductSnapshot {
        ProductSnapshot { id: id.into(), name: format!("Product {id}"), price: Decimal::new(price, 0), images: vec![] }
    }

    fn server_line(id: &str, product: &str, quantity: u32, price: i64) -> CartLineItem {
        CartLineItem { id: id.into(), product_id: product.into(), quantity, product: snapshot(product, price), sync: SyncState::Confirmed }
    }

    #[test]
    fn test_cart_operations() {
        let mut cart = Cart::new("NGN");
        let id = cart.add_optimistic(snapshot("P1", 10), 2).unwrap();
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_price().amount(), Decimal::new(20, 0));
        let merged = cart.add_optimistic(snapshot("P1", 10), 1).unwrap();
        assert_eq!(merged, id);
        assert_eq!(cart.items()[0].quantity, 3); // Merged
        assert_eq!(cart.items()[0].sync, SyncState::Optimistic);
    }

    #[test]
    fn test_total_items_tracks_every_mutation() {
        let mut cart = Cart::default();
        let a = cart.add_optimistic(snapshot("A", 5), 2).unwrap();
        let b = cart.add_optimistic(snapshot("B", 7), 4).unwrap();
        cart.add_optimistic(snapshot("C", 1), 1).unwrap();
        cart.remove(&b).unwrap();
        cart.add_optimistic(snapshot("A", 5), 3).unwrap();
        cart.remove(&a).unwrap();
        let expected: u32 = cart.items().iter().map(|i| i.quantity).sum();
        assert_eq!(cart.total_items(), expected);
        assert_eq!(cart.total_items(), 1);
    }

    #[test]
    fn test_zero_quantity_removes_line() {
        let mut cart = Cart::default();
        let id = cart.add_optimistic(snapshot("A", 5), 2).unwrap();
        cart.update_quantity(&id, 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.update_quantity(&id, 1), Err(CartError::ItemNotFound(id.clone())));
    }

    #[test]
    fn test_add_rejects_zero_quantity() {
        let mut cart = Cart::default();
        assert_eq!(cart.add_optimistic(snapshot("A", 5), 0), Err(CartError::InvalidQuantity));
    }

    #[test]
    fn test_clear_empties_cart() {
        let mut cart = Cart::default();
        cart.add_optimistic(snapshot("A", 5), 2).unwrap();
        cart.add_optimistic(snapshot("B", 9), 1).unwrap();
        cart.clear();
        assert!(cart.items().is_empty());
        assert!(cart.total_price().is_zero());
        assert_eq!(cart.total_items(), 0);
    }

    #[test]
    fn test_confirm_replaces_local_line() {
        let mut cart = Cart::default();
        let local = cart.add_optimistic(snapshot("A", 5), 2).unwrap();
        assert!(cart.line(&local).unwrap().is_local());
        cart.confirm_line(&local, server_line("srv-1", "A", 2, 5));
        assert!(cart.line(&local).is_none());
        let line = cart.line("srv-1").unwrap();
        assert_eq!(line.sync, SyncState::Confirmed);
        assert!(!cart.has_pending_changes());
    }

    #[test]
    fn test_confirm_folds_into_known_server_line() {
        let mut cart = Cart::default();
        cart.replace_with(vec![server_line("srv-1", "A", 1, 5)]);
        // a second device added the same product; our line still has a local id
        let local = format!("{LOCAL_ID_PREFIX}x");
        cart.items.push(CartLineItem { id: local.clone(), ..server_line("", "A", 1, 5) });
        cart.confirm_line(&local, server_line("srv-1", "A", 2, 5));
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_items(), 2);
    }

    #[test]
    fn test_reverting_then_resync() {
        let mut cart = Cart::default();
        let id = cart.add_optimistic(snapshot("A", 5), 2).unwrap();
        cart.mark_reverting(&id);
        assert_eq!(cart.line(&id).unwrap().sync, SyncState::Reverting);
        cart.replace_with(vec![server_line("srv-9", "B", 1, 40)]);
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_price().amount(), Decimal::new(40, 0));
        assert!(!cart.has_pending_changes());
    }

    #[test]
    fn test_persisted_shape_round_trips() {
        let mut cart = Cart::default();
        cart.add_optimistic(snapshot("A", 5), 2).unwrap();
        let json = serde_json::to_string(&cart).unwrap();
        let restored: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cart);
    }
}
