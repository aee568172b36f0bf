//! Order placement.
//!
//! `Idle -> OrderCreating`, then either `OrderConfirmed` (cash on delivery) or
//! `PaymentIntentCreating -> AwaitingCardPayment` (card). Any failure passes
//! through `Failed` and lands back on `Idle` with an error toast. The two
//! network calls run one after the other; an order created before a failed
//! payment intent call is left in place.

use std::sync::atomic::{AtomicBool, Ordering};

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::api::CreatePaymentIntent;
use crate::domain::aggregates::{
    Cart, Checkout, CheckoutIssue, CheckoutTotals, CreateOrder, CreateOrderItem, Order, PaymentMethod,
};
use crate::domain::events::{Route, StorefrontEvent};
use crate::{PaymentIntent, Result, Storefront, StorefrontError};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PlacementState {
    #[default]
    Idle,
    OrderCreating,
    PaymentIntentCreating { order_id: String },
    AwaitingCardPayment { order_id: String },
    OrderConfirmed { order_id: String },
    Failed,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlacementOutcome {
    OrderConfirmed { order: Order, amount: Decimal },
    AwaitingCardPayment { order: Order, intent: PaymentIntent, amount: Decimal },
}

impl PlacementOutcome {
    pub fn order(&self) -> &Order {
        match self { Self::OrderConfirmed { order, .. } | Self::AwaitingCardPayment { order, .. } => order }
    }

    pub fn amount(&self) -> Decimal {
        match self { Self::OrderConfirmed { amount, .. } | Self::AwaitingCardPayment { amount, .. } => *amount }
    }
}

/// Holds the in-flight flag for the lifetime of one placement attempt.
struct PlacingGuard<'a>(&'a AtomicBool);

impl<'a> PlacingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| Self(flag))
            .map_err(|_| StorefrontError::PlacementInProgress)
    }
}

impl Drop for PlacingGuard<'_> {
    fn drop(&mut self) { self.0.store(false, Ordering::SeqCst); }
}

fn order_request(cart: &Cart, checkout: &Checkout, totals: &CheckoutTotals) -> Result<CreateOrder> {
    let selection = checkout.selection();
    let address_id = selection.selected_address_id.clone().ok_or_else(|| StorefrontError::Validation(vec![CheckoutIssue::MissingAddress]))?;
    let option = checkout.delivery_option().ok_or_else(|| StorefrontError::Validation(vec![CheckoutIssue::MissingDeliveryOption]))?;
    Ok(CreateOrder {
        items: cart
            .items()
            .iter()
            .map(|i| CreateOrderItem { product_id: i.product_id.clone(), quantity: i.quantity, price: i.unit_price() })
            .collect(),
        billing_address_id: address_id.clone(),
        shipping_address_id: address_id,
        delivery_time: option.time_estimate.clone(),
        shipping_amount: totals.delivery_fee.amount(),
        tax_amount: totals.tax.amount(),
        payment_method: checkout.payment_method(),
        notes: checkout.order_notes(),
    })
}

impl Storefront {
    pub async fn placement_state(&self) -> PlacementState { self.placement.lock().await.clone() }

    /// The intent handed to the card payment form after a card order.
    pub async fn pending_payment_intent(&self) -> Option<PaymentIntent> {
        self.checkout.lock().await.payment_intent().cloned()
    }

    async fn set_placement(&self, state: PlacementState) {
        info!(?state, "placement state");
        *self.placement.lock().await = state;
    }

    /// Places an order from the current cart and checkout selections.
    #[instrument(skip(self))]
    pub async fn place_order(&self) -> Result<PlacementOutcome> {
        let _guard = PlacingGuard::acquire(&self.placing)?;
        match self.run_placement().await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.set_placement(PlacementState::Failed).await;
                let err = self.report("Failed to place order", err).await;
                self.set_placement(PlacementState::Idle).await;
                Err(err)
            }
        }
    }

    async fn run_placement(&self) -> Result<PlacementOutcome> {
        let cart = self.cart().await;
        let checkout = self.checkout().await;

        let issues = checkout.issues(cart.is_empty(), false);
        if !issues.is_empty() {
            return Err(StorefrontError::Validation(issues));
        }

        let totals = checkout.totals(&cart.total_price());
        let method = checkout.payment_method();
        let amount = totals.total.amount();
        if method == PaymentMethod::Card && amount < self.min_card_charge {
            return Err(StorefrontError::BelowMinimumCharge { amount, minimum: self.min_card_charge });
        }

        let request = order_request(&cart, &checkout, &totals)?;
        self.set_placement(PlacementState::OrderCreating).await;
        let order = self.api.create_order(&request).await?;
        info!(order_id = %order.id, order_number = %order.order_number, %method, %amount, "order created");

        match method {
            PaymentMethod::CashOnDelivery => {
                self.finish_checkout().await;
                self.set_placement(PlacementState::OrderConfirmed { order_id: order.id.clone() }).await;
                self.emit(StorefrontEvent::success(format!("Order {} placed", order.order_number))).await;
                self.emit(StorefrontEvent::Navigate(Route::OrderConfirmation {
                    order: Box::new(order.clone()),
                    payment_method: method,
                    amount,
                }))
                .await;
                Ok(PlacementOutcome::OrderConfirmed { order, amount })
            }
            PaymentMethod::Card => {
                self.set_placement(PlacementState::PaymentIntentCreating { order_id: order.id.clone() }).await;
                let request = CreatePaymentIntent { order_id: order.id.clone(), amount, currency: self.currency.clone() };
                let intent = self.api.create_payment_intent(&request).await.map_err(|e| {
                    warn!(order_id = %order.id, "order was created but its payment intent was not");
                    e
                })?;

                self.finish_checkout().await;
                self.checkout.lock().await.store_payment_intent(intent.clone());
                self.set_placement(PlacementState::AwaitingCardPayment { order_id: order.id.clone() }).await;
                self.emit(StorefrontEvent::Navigate(Route::Payment {
                    order_id: order.id.clone(),
                    intent: intent.clone(),
                    amount,
                }))
                .await;
                Ok(PlacementOutcome::AwaitingCardPayment { order, intent, amount })
            }
        }
    }

    /// Empties the cart and resets checkout selections once an order exists.
    async fn finish_checkout(&self) {
        if let Err(e) = self.clear_cart().await {
            warn!(error = %e, "order placed but the cart could not be cleared");
        }
        self.checkout.lock().await.reset();
    }
}
