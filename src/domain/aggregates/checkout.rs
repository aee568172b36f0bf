//! Checkout Aggregate
//!
//! Four independent selections gate order placement: address, delivery option,
//! delivery instructions and payment method. Only address and delivery option
//! are required.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::value_objects::Money;
use crate::PaymentIntent;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Card,
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Card => "CARD", Self::CashOnDelivery => "CASH_ON_DELIVERY" }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOption {
    pub id: String,
    pub label: String,
    pub description: String,
    pub time_estimate: String,
    pub price: Decimal,
    /// Fraction of the cart subtotal charged as tax, e.g. 0.075.
    pub tax_rate: Decimal,
}

impl DeliveryOption {
    pub fn new(id: &str, label: &str, description: &str, time_estimate: &str, price: Decimal, tax_rate: Decimal) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: description.into(),
            time_estimate: time_estimate.into(),
            price,
            tax_rate,
        }
    }

    pub fn defaults() -> Vec<Self> {
        let vat = Decimal::new(75, 3);
        vec![
            Self::new("standard", "Standard Delivery", "Delivered by our courier partners", "3-5 business days", Decimal::new(1500, 0), vat),
            Self::new("express", "Express Delivery", "Priority handling and dispatch", "1-2 business days", Decimal::new(3500, 0), vat),
            Self::new("same-day", "Same Day Delivery", "Orders placed before noon, within city limits", "Today", Decimal::new(5000, 0), vat),
        ]
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSelection {
    pub selected_address_id: Option<String>,
    pub selected_delivery_option_id: Option<String>,
    pub delivery_instructions: String,
    pub selected_payment_method: PaymentMethod,
}

/// A precondition for placing an order that is not met yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutIssue {
    MissingAddress,
    MissingDeliveryOption,
    EmptyCart,
    RequestInFlight,
}

impl fmt::Display for CheckoutIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAddress => write!(f, "Select a delivery address"),
            Self::MissingDeliveryOption => write!(f, "Choose a delivery option"),
            Self::EmptyCart => write!(f, "Your cart is empty"),
            Self::RequestInFlight => write!(f, "Your order is being placed"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutTotals {
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub tax: Money,
    pub total: Money,
}

#[derive(Clone, Debug)]
pub struct Checkout {
    selection: CheckoutSelection,
    delivery_options: Vec<DeliveryOption>,
    payment_intent: Option<PaymentIntent>,
}

impl Default for Checkout { fn default() -> Self { Self::new(DeliveryOption::defaults()) } }

impl Checkout {
    pub fn new(delivery_options: Vec<DeliveryOption>) -> Self {
        Self { selection: CheckoutSelection::default(), delivery_options, payment_intent: None }
    }

    pub fn selection(&self) -> &CheckoutSelection { &self.selection }
    pub fn delivery_options(&self) -> &[DeliveryOption] { &self.delivery_options }
    pub fn payment_method(&self) -> PaymentMethod { self.selection.selected_payment_method }
    pub fn payment_intent(&self) -> Option<&PaymentIntent> { self.payment_intent.as_ref() }

    pub fn delivery_option(&self) -> Option<&DeliveryOption> {
        let id = self.selection.selected_delivery_option_id.as_deref()?;
        self.delivery_options.iter().find(|o| o.id == id)
    }

    pub fn select_address(&mut self, address_id: impl Into<String>) {
        self.selection.selected_address_id = Some(address_id.into());
    }

    pub fn clear_address(&mut self) { self.selection.selected_address_id = None; }

    /// Returns `None` and leaves the selection unchanged when `option_id` is not offered.
    pub fn select_delivery_option(&mut self, option_id: &str) -> Option<&DeliveryOption> {
        let option = self.delivery_options.iter().find(|o| o.id == option_id)?;
        self.selection.selected_delivery_option_id = Some(option.id.clone());
        Some(option)
    }

    pub fn set_delivery_instructions(&mut self, text: impl Into<String>) {
        self.selection.delivery_instructions = text.into();
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) {
        self.selection.selected_payment_method = method;
    }

    pub fn store_payment_intent(&mut self, intent: PaymentIntent) { self.payment_intent = Some(intent); }
    pub fn take_payment_intent(&mut self) -> Option<PaymentIntent> { self.payment_intent.take() }

    /// Address and delivery option chosen, and no placement request pending.
    pub fn is_form_valid(&self, request_in_flight: bool) -> bool {
        self.selection.selected_address_id.is_some() && self.delivery_option().is_some() && !request_in_flight
    }

    pub fn issues(&self, cart_is_empty: bool, request_in_flight: bool) -> Vec<CheckoutIssue> {
        let mut issues = Vec::new();
        if self.selection.selected_address_id.is_none() { issues.push(CheckoutIssue::MissingAddress); }
        if self.delivery_option().is_none() { issues.push(CheckoutIssue::MissingDeliveryOption); }
        if cart_is_empty { issues.push(CheckoutIssue::EmptyCart); }
        if request_in_flight { issues.push(CheckoutIssue::RequestInFlight); }
        issues
    }

    /// Tax is charged on the subtotal alone, never on the delivery fee.
    pub fn totals(&self, subtotal: &Money) -> CheckoutTotals {
        let currency = subtotal.currency();
        let (delivery_fee, tax) = match self.delivery_option() {
            Some(option) => (Money::new(option.price, currency), subtotal.apply_rate(option.tax_rate)),
            None => (Money::zero(currency), Money::zero(currency)),
        };
        let total = Money::new(subtotal.amount() + delivery_fee.amount() + tax.amount(), currency);
        CheckoutTotals { subtotal: subtotal.clone(), delivery_fee, tax, total }
    }

    /// Order notes carrying the delivery instructions, if any were given.
    pub fn order_notes(&self) -> Option<String> {
        let text = self.selection.delivery_instructions.trim();
        (!text.is_empty()).then(|| format!("Delivery instructions: {text}"))
    }

    pub fn reset(&mut self) {
        self.selection = CheckoutSelection::default();
        self.payment_intent = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkout_with_option(price: i64, tax_rate: Decimal) -> Checkout {
        let mut checkout = Checkout::new(vec![DeliveryOption::new("std", "Standard", "", "3 days", Decimal::new(price, 0), tax_rate)]);
        checkout.select_delivery_option("std").unwrap();
        checkout
    }

    #[test]
    fn test_totals_tax_on_subtotal_only() {
        let checkout = checkout_with_option(20, Decimal::new(75, 3));
        let totals = checkout.totals(&Money::ngn(Decimal::new(300, 0)));
        assert_eq!(totals.tax.amount(), Decimal::new(2250, 2));
        assert_eq!(totals.delivery_fee.amount(), Decimal::new(20, 0));
        assert_eq!(totals.total.amount(), Decimal::new(34250, 2));
    }

    #[test]
    fn test_form_invalid_without_address() {
        let mut checkout = checkout_with_option(20, Decimal::ZERO);
        for method in [PaymentMethod::Card, PaymentMethod::CashOnDelivery] {
            checkout.set_payment_method(method);
            checkout.set_delivery_instructions("Leave at the gate");
            assert!(!checkout.is_form_valid(false));
        }
        checkout.select_address("addr-1");
        assert!(checkout.is_form_valid(false));
        assert!(!checkout.is_form_valid(true));
    }

    #[test]
    fn test_issues_name_each_unmet_precondition() {
        let checkout = Checkout::default();
        assert_eq!(
            checkout.issues(true, true),
            vec![CheckoutIssue::MissingAddress, CheckoutIssue::MissingDeliveryOption, CheckoutIssue::EmptyCart, CheckoutIssue::RequestInFlight]
        );
    }

    #[test]
    fn test_unknown_delivery_option_keeps_previous() {
        let mut checkout = Checkout::default();
        checkout.select_delivery_option("express").unwrap();
        assert!(checkout.select_delivery_option("drone").is_none());
        assert_eq!(checkout.delivery_option().unwrap().id, "express");
    }

    #[test]
    fn test_switching_payment_method_keeps_selections() {
        let mut checkout = Checkout::default();
        checkout.select_address("addr-1");
        checkout.select_delivery_option("standard").unwrap();
        checkout.set_payment_method(PaymentMethod::CashOnDelivery);
        assert_eq!(checkout.selection().selected_address_id.as_deref(), Some("addr-1"));
        assert_eq!(checkout.delivery_option().unwrap().id, "standard");
    }

    #[test]
    fn test_order_notes() {
        let mut checkout = Checkout::default();
        assert_eq!(checkout.order_notes(), None);
        checkout.set_delivery_instructions("  Call on arrival ");
        assert_eq!(checkout.order_notes().as_deref(), Some("Delivery instructions: Call on arrival"));
        checkout.reset();
        assert_eq!(checkout.order_notes(), None);
    }

    #[test]
    fn test_payment_method_wire_names() {
        assert_eq!(serde_json::to_string(&PaymentMethod::CashOnDelivery).unwrap(), "\"CASH_ON_DELIVERY\"");
        assert_eq!(PaymentMethod::Card.to_string(), "CARD");
    }
}
