//! Order Aggregate
//!
//! Orders are owned by the server. The client keeps a read-only projection and
//! can only ask for status changes (cancel, refund).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::checkout::PaymentMethod;
use crate::Address;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Pending, Confirmed, Processing, Shipped, Delivered, Cancelled, Refunded }

impl OrderStatus {
    pub fn is_terminal(&self) -> bool { matches!(self, Self::Cancelled | Self::Refunded) }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub amount: Decimal,
    pub status: String,
    #[serde(default)]
    pub method: Option<PaymentMethod>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_number: String,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub shipping_amount: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn item_count(&self) -> u32 { self.items.iter().map(|i| i.quantity).sum() }

    /// Whether the server would accept a cancellation request.
    pub fn can_cancel(&self) -> bool { matches!(self.status, OrderStatus::Pending | OrderStatus::Confirmed) }

    pub fn can_request_refund(&self) -> bool {
        matches!(self.status, OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::Delivered)
    }

    pub fn amount_paid(&self) -> Decimal { self.payments.iter().map(|p| p.amount).sum() }
}

/// Body of the create-order request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrder {
    pub items: Vec<CreateOrderItem>,
    pub shipping_address_id: String,
    pub billing_address_id: String,
    pub delivery_time: String,
    pub shipping_amount: Decimal,
    pub tax_amount: Decimal,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderItem {
    pub product_id: String,
    pub quantity: u32,
    pub price: Decimal,
}
