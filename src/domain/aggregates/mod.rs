//! Aggregates module
pub mod offer;
pub mod cart;
pub mod checkout;
pub mod order;

pub use offer::{DiscountOffer, DiscountType, OfferCatalog};
pub use cart::{Cart, CartError, CartLineItem, SyncState};
pub use checkout::{Checkout, CheckoutIssue, CheckoutSelection, CheckoutTotals, DeliveryOption, PaymentMethod};
pub use order::{CreateOrder, CreateOrderItem, Order, OrderItem, OrderStatus, Payment};
