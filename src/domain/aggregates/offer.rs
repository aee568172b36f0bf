//! Discount offers
//!
//! Offers are read-only reference data. A product may be covered by several
//! overlapping offers; only the one giving the largest discount is applied.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::round_whole;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
    BuyOneGetOne,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountOffer {
    pub id: String,
    pub product_ids: BTreeSet<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    #[serde(default)]
    pub min_quantity: Option<u32>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
}

impl DiscountOffer {
    pub fn applies_to(&self, product_id: &str, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_date <= now && now <= self.end_date && self.product_ids.contains(product_id)
    }

    /// Amount this offer takes off a single unit at `price`.
    ///
    /// Buy-one-get-one needs a second unit, so it takes nothing off a unit price.
    pub fn discount_amount(&self, price: Decimal) -> Decimal {
        match self.discount_type {
            DiscountType::Percentage => price * self.discount_value / Decimal::ONE_HUNDRED,
            DiscountType::Fixed => self.discount_value,
            DiscountType::BuyOneGetOne => Decimal::ZERO,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferCatalog {
    offers: Vec<DiscountOffer>,
}

impl OfferCatalog {
    pub fn new(offers: Vec<DiscountOffer>) -> Self { Self { offers } }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn offers(&self) -> &[DiscountOffer] { &self.offers }
    pub fn is_empty(&self) -> bool { self.offers.is_empty() }

    pub fn offers_for_product(&self, product_id: &str, now: DateTime<Utc>) -> Vec<&DiscountOffer> {
        self.offers.iter().filter(|o| o.applies_to(product_id, now)).collect()
    }

    /// The applicable offer with the largest discount on `price`. Ties keep the first listed.
    ///
    /// Offers that take nothing off a single unit never win.
    pub fn best_offer(&self, price: Decimal, product_id: &str, now: DateTime<Utc>) -> Option<&DiscountOffer> {
        self.offers_for_product(product_id, now)
            .into_iter()
            .filter(|o| o.discount_amount(price) > Decimal::ZERO)
            .fold(None, |best: Option<&DiscountOffer>, offer| match best {
                Some(b) if b.discount_amount(price) >= offer.discount_amount(price) => Some(b),
                _ => Some(offer),
            })
    }

    /// Price after the best applicable offer, floored at zero and rounded to a whole unit.
    ///
    /// Returns `original` untouched when nothing applies or when it is negative.
    pub fn discounted_price(&self, original: Decimal, product_id: &str, now: DateTime<Utc>) -> Decimal {
        if original.is_sign_negative() {
            return original;
        }
        match self.best_offer(original, product_id, now) {
            None => original,
            Some(offer) => {
                let discounted = (original - offer.discount_amount(original)).max(Decimal::ZERO);
                round_whole(discounted)
            }
        }
    }
}
