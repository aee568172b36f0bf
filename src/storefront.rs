//! Application-scoped storefront state.
//!
//! `Storefront` owns everything one shopper session needs: the API handle,
//! the offer catalog, the cart, the checkout selections and the persisted
//! browse filters. Callers receive it by reference (or `Arc`) instead of
//! reaching for globals; `logout` resets it.
//!
//! Cart mutations are optimistic: the local cart changes first, then the
//! request is sent. A failed request re-syncs the cart from the server rather
//! than undoing the local change.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};
use validator::Validate;

use crate::api::{AddCartItem, HttpApi, ProductQuery, StorefrontApi};
use crate::config::StorefrontConfig;
use crate::domain::aggregates::{
    Cart, CartLineItem, Checkout, CheckoutIssue, CheckoutTotals, DeliveryOption, DiscountOffer, OfferCatalog, Order,
    PaymentMethod,
};
use crate::domain::events::StorefrontEvent;
use crate::domain::value_objects::Money;
use crate::placement::PlacementState;
use crate::storage::{self, FileStore, KeyValueStore, BROWSE_FILTERS_KEY, CART_KEY};
use crate::{Address, NewAddress, NewReview, Product, ProductListing, Result, Review, StorefrontError, WishlistItem};

pub struct Storefront {
    pub(crate) api: Arc<dyn StorefrontApi>,
    store: Arc<dyn KeyValueStore>,
    offers: OfferCatalog,
    pub(crate) currency: String,
    pub(crate) min_card_charge: Decimal,
    pub(crate) cart: Mutex<Cart>,
    pub(crate) checkout: Mutex<Checkout>,
    filters: Mutex<ProductQuery>,
    pub(crate) placement: Mutex<PlacementState>,
    pub(crate) placing: AtomicBool,
    events: Mutex<Vec<StorefrontEvent>>,
}

impl Storefront {
    pub fn new(api: Arc<dyn StorefrontApi>, store: Arc<dyn KeyValueStore>, config: &StorefrontConfig) -> Self {
        Self {
            api,
            store,
            offers: OfferCatalog::default(),
            currency: config.currency.clone(),
            min_card_charge: config.min_card_charge,
            cart: Mutex::new(Cart::new(&config.currency)),
            checkout: Mutex::new(Checkout::default()),
            filters: Mutex::new(ProductQuery::default()),
            placement: Mutex::new(PlacementState::Idle),
            placing: AtomicBool::new(false),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn with_offers(mut self, offers: OfferCatalog) -> Self {
        self.offers = offers;
        self
    }

    pub fn with_delivery_options(mut self, options: Vec<DeliveryOption>) -> Self {
        self.checkout = Mutex::new(Checkout::new(options));
        self
    }

    /// HTTP backend, file-backed state and the configured offer catalog, with persisted state restored.
    pub async fn from_config(config: &StorefrontConfig) -> Result<Self> {
        let api = Arc::new(HttpApi::new(config)?);
        let store = Arc::new(FileStore::new(&config.state_dir));
        let mut storefront = Self::new(api, store, config);
        if let Some(path) = &config.offers_path {
            let raw = tokio::fs::read_to_string(path).await.map_err(|e| StorefrontError::Storage(format!("{}: {e}", path.display())))?;
            storefront.offers = OfferCatalog::from_json(&raw)?;
            info!(offers = storefront.offers.offers().len(), "loaded offer catalog");
        }
        storefront.restore().await?;
        Ok(storefront)
    }

    /// Rehydrate cart and browse filters from storage. Values that no longer
    /// decode are dropped and the session starts from defaults.
    pub async fn restore(&self) -> Result<()> {
        if let Some(cart) = self.load_or_discard::<Cart>(CART_KEY).await? {
            info!(lines = cart.line_count(), "restored cart");
            *self.cart.lock().await = cart;
        }
        if let Some(filters) = self.load_or_discard::<ProductQuery>(BROWSE_FILTERS_KEY).await? {
            *self.filters.lock().await = filters;
        }
        Ok(())
    }

    async fn load_or_discard<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match storage::load_json::<T>(self.store.as_ref(), key).await {
            Err(StorefrontError::Decode(e)) => {
                warn!(key, error = %e, "discarding unreadable persisted state");
                self.store.remove(key).await?;
                Ok(None)
            }
            other => other,
        }
    }

    /// Clears every piece of session state, in memory and in storage.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        *self.cart.lock().await = Cart::new(&self.currency);
        self.checkout.lock().await.reset();
        *self.filters.lock().await = ProductQuery::default();
        *self.placement.lock().await = PlacementState::Idle;
        self.events.lock().await.clear();
        self.store.remove(CART_KEY).await?;
        self.store.remove(BROWSE_FILTERS_KEY).await?;
        self.api.invalidate_all().await;
        info!("storefront session reset");
        Ok(())
    }

    // =========================================================================
    // Events
    // =========================================================================

    pub async fn take_events(&self) -> Vec<StorefrontEvent> { std::mem::take(&mut *self.events.lock().await) }

    pub(crate) async fn emit(&self, event: StorefrontEvent) { self.events.lock().await.push(event); }

    /// Logs a failed request and tells the user about it.
    pub(crate) async fn report(&self, context: &str, err: StorefrontError) -> StorefrontError {
        error!(error = %err, "{context}");
        self.emit(StorefrontEvent::error(format!("{context}: {err}"))).await;
        err
    }

    // =========================================================================
    // Browsing
    // =========================================================================

    pub fn offers(&self) -> &OfferCatalog { &self.offers }

    pub fn offers_for_product(&self, product_id: &str) -> Vec<&DiscountOffer> {
        self.offers.offers_for_product(product_id, Utc::now())
    }

    pub fn listing(&self, product: Product) -> ProductListing {
        let now = Utc::now();
        let offer_id = self.offers.best_offer(product.price, &product.id, now).map(|o| o.id.clone());
        let display_price = self.offers.discounted_price(product.price, &product.id, now);
        ProductListing { product, display_price, offer_id }
    }

    pub async fn filters(&self) -> ProductQuery { self.filters.lock().await.clone() }

    /// Lists products with the given filters, or the persisted ones when `None`.
    #[instrument(skip(self))]
    pub async fn browse(&self, query: Option<ProductQuery>) -> Result<Vec<ProductListing>> {
        let query = match query {
            Some(query) => {
                *self.filters.lock().await = query.clone();
                if let Err(e) = storage::save_json(self.store.as_ref(), BROWSE_FILTERS_KEY, &query).await {
                    warn!(error = %e, "could not persist browse filters");
                }
                query
            }
            None => self.filters().await,
        };
        let products = self.api.list_products(&query).await?;
        Ok(products.into_iter().map(|p| self.listing(p)).collect())
    }

    pub async fn product(&self, product_id: &str) -> Result<ProductListing> {
        Ok(self.listing(self.api.get_product(product_id).await?))
    }

    // =========================================================================
    // Cart
    // =========================================================================

    pub async fn cart(&self) -> Cart { self.cart.lock().await.clone() }
    pub async fn total_items(&self) -> u32 { self.cart.lock().await.total_items() }
    pub async fn total_price(&self) -> Money { self.cart.lock().await.total_price() }

    /// Writes the cart while holding its lock so snapshots reach storage in order.
    async fn persist_cart(&self) {
        let cart = self.cart.lock().await;
        if let Err(e) = storage::save_json(self.store.as_ref(), CART_KEY, &*cart).await {
            warn!(error = %e, "could not persist cart");
        }
    }

    /// Marks `line_ids` as reverting and replaces the cart with the server's copy.
    async fn resync_cart(&self, line_ids: &[String]) {
        {
            let mut cart = self.cart.lock().await;
            for id in line_ids {
                cart.mark_reverting(id);
            }
        }
        match self.api.get_cart().await {
            Ok(items) => {
                let total_items = {
                    let mut cart = self.cart.lock().await;
                    cart.replace_with(items);
                    cart.total_items()
                };
                self.emit(StorefrontEvent::CartSynced { total_items }).await;
            }
            Err(e) => warn!(error = %e, "cart re-sync failed; keeping local state"),
        }
        self.persist_cart().await;
    }

    async fn cart_failure(&self, context: &str, line_ids: &[String], err: StorefrontError) -> StorefrontError {
        let err = self.report(context, err).await;
        self.resync_cart(line_ids).await;
        err
    }

    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_to_cart(&self, product: &Product, quantity: u32) -> Result<CartLineItem> {
        let line_id = self.cart.lock().await.add_optimistic(product.into(), quantity)?;
        self.persist_cart().await;

        let request = AddCartItem { product_id: product.id.clone(), quantity };
        match self.api.add_cart_item(&request).await {
            Ok(server) => {
                self.cart.lock().await.confirm_line(&line_id, server.clone());
                self.persist_cart().await;
                Ok(server)
            }
            Err(e) => Err(self.cart_failure("Failed to add item to cart", &[line_id], e).await),
        }
    }

    /// Sets a line's quantity. Zero removes the line.
    #[instrument(skip(self))]
    pub async fn update_quantity(&self, line_id: &str, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return self.remove_from_cart(line_id).await;
        }
        self.cart.lock().await.update_quantity(line_id, quantity)?;
        self.persist_cart().await;

        match self.api.update_cart_item(line_id, quantity).await {
            Ok(server) => {
                self.cart.lock().await.confirm_line(line_id, server);
                self.persist_cart().await;
                Ok(())
            }
            Err(e) => Err(self.cart_failure("Failed to update quantity", &[line_id.to_string()], e).await),
        }
    }

    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, line_id: &str) -> Result<()> {
        self.cart.lock().await.remove(line_id)?;
        self.persist_cart().await;

        match self.api.remove_cart_item(line_id).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.cart_failure("Failed to remove item from cart", &[], e).await),
        }
    }

    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<()> {
        self.cart.lock().await.clear();
        self.persist_cart().await;

        match self.api.clear_cart().await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.cart_failure("Failed to clear cart", &[], e).await),
        }
    }

    /// Replace local cart state with the server's.
    pub async fn refresh_cart(&self) -> Result<()> {
        let items = self.api.get_cart().await?;
        self.cart.lock().await.replace_with(items);
        self.persist_cart().await;
        Ok(())
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    pub async fn checkout(&self) -> Checkout { self.checkout.lock().await.clone() }

    pub async fn select_address(&self, address_id: &str) { self.checkout.lock().await.select_address(address_id); }

    pub async fn select_delivery_option(&self, option_id: &str) -> Result<DeliveryOption> {
        self.checkout
            .lock()
            .await
            .select_delivery_option(option_id)
            .cloned()
            .ok_or_else(|| StorefrontError::InvalidInput(format!("unknown delivery option `{option_id}`")))
    }

    pub async fn set_delivery_instructions(&self, text: &str) { self.checkout.lock().await.set_delivery_instructions(text); }

    pub async fn set_payment_method(&self, method: PaymentMethod) { self.checkout.lock().await.set_payment_method(method); }

    pub fn is_placing_order(&self) -> bool { self.placing.load(std::sync::atomic::Ordering::SeqCst) }

    /// Whether "Place Order" should be enabled.
    pub async fn is_form_valid(&self) -> bool { self.checkout.lock().await.is_form_valid(self.is_placing_order()) }

    pub async fn checkout_issues(&self) -> Vec<CheckoutIssue> {
        let cart_is_empty = self.cart.lock().await.is_empty();
        self.checkout.lock().await.issues(cart_is_empty, self.is_placing_order())
    }

    pub async fn checkout_totals(&self) -> CheckoutTotals {
        let subtotal = self.total_price().await;
        self.checkout.lock().await.totals(&subtotal)
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    pub async fn addresses(&self) -> Result<Vec<Address>> { self.api.list_addresses().await }

    /// Saves a new address. It becomes the checkout address when it is the
    /// default or when none is selected yet.
    #[instrument(skip(self, address))]
    pub async fn add_address(&self, address: NewAddress) -> Result<Address> {
        address.validate()?;
        let created = match self.api.create_address(&address).await {
            Ok(created) => created,
            Err(e) => return Err(self.report("Failed to save address", e).await),
        };
        let mut checkout = self.checkout.lock().await;
        if created.is_default || checkout.selection().selected_address_id.is_none() {
            checkout.select_address(created.id.clone());
        }
        Ok(created)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    pub async fn order_history(&self) -> Result<Vec<Order>> { self.api.list_orders().await }

    pub async fn order(&self, order_id: &str) -> Result<Order> { self.api.get_order(order_id).await }

    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: &str) -> Result<Order> {
        match self.api.cancel_order(order_id).await {
            Ok(order) => {
                self.emit(StorefrontEvent::success(format!("Order {} cancelled", order.order_number))).await;
                Ok(order)
            }
            Err(e) => Err(self.report("Failed to cancel order", e).await),
        }
    }

    #[instrument(skip(self))]
    pub async fn request_refund(&self, order_id: &str, reason: Option<&str>) -> Result<Order> {
        match self.api.request_refund(order_id, reason).await {
            Ok(order) => {
                self.emit(StorefrontEvent::success(format!("Refund requested for order {}", order.order_number))).await;
                Ok(order)
            }
            Err(e) => Err(self.report("Failed to request refund", e).await),
        }
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    pub async fn reviews(&self, product_id: &str) -> Result<Vec<Review>> { self.api.list_reviews(product_id).await }

    #[instrument(skip(self, review), fields(product_id = %review.product_id))]
    pub async fn submit_review(&self, review: NewReview) -> Result<Review> {
        review.validate()?;
        match self.api.create_review(&review).await {
            Ok(created) => {
                self.emit(StorefrontEvent::success("Thanks for your review")).await;
                Ok(created)
            }
            Err(e) => Err(self.report("Failed to submit review", e).await),
        }
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    pub async fn wishlist(&self) -> Result<Vec<WishlistItem>> { self.api.list_wishlist().await }

    pub async fn add_to_wishlist(&self, product_id: &str) -> Result<WishlistItem> {
        match self.api.add_to_wishlist(product_id).await {
            Ok(item) => Ok(item),
            Err(e) => Err(self.report("Failed to add to wishlist", e).await),
        }
    }

    pub async fn remove_from_wishlist(&self, product_id: &str) -> Result<()> {
        match self.api.remove_from_wishlist(product_id).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.report("Failed to remove from wishlist", e).await),
        }
    }

    /// Adds or removes `product_id`; returns whether it is now wishlisted.
    pub async fn toggle_wishlist(&self, product_id: &str) -> Result<bool> {
        let listed = self.wishlist().await?.iter().any(|w| w.product_id == product_id);
        if listed {
            self.remove_from_wishlist(product_id).await?;
        } else {
            self.add_to_wishlist(product_id).await?;
        }
        Ok(!listed)
    }
}
