//! Events raised for the presentation layer
use rust_decimal::Decimal;

use crate::domain::aggregates::{Order, PaymentMethod};
use crate::PaymentIntent;

#[derive(Clone, Debug, PartialEq)]
pub enum StorefrontEvent {
    /// A user-facing notification.
    Toast { level: ToastLevel, message: String },
    Navigate(Route),
    /// The cart was replaced by the server's copy.
    CartSynced { total_items: u32 },
}

impl StorefrontEvent {
    pub fn error(message: impl Into<String>) -> Self { Self::Toast { level: ToastLevel::Error, message: message.into() } }
    pub fn success(message: impl Into<String>) -> Self { Self::Toast { level: ToastLevel::Success, message: message.into() } }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel { Success, Error }

#[derive(Clone, Debug, PartialEq)]
pub enum Route {
    OrderConfirmation { order: Box<Order>, payment_method: PaymentMethod, amount: Decimal },
    Payment { order_id: String, intent: PaymentIntent, amount: Decimal },
}
