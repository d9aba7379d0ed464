//! Cart pricing: subtotal, flat shipping, threshold discount, total.
//!
//! This is the single authority for order pricing. Aggregates supplied by
//! clients are treated as display hints and recomputed here before anything
//! is persisted.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Flat shipping fee applied to any non-empty cart.
pub const FLAT_SHIPPING_FEE: Decimal = dec!(30.00);

/// Subtotal above which the percentage discount kicks in.
pub const DISCOUNT_THRESHOLD: Decimal = dec!(3000);

/// Discount rate applied once the subtotal exceeds the threshold.
pub const DISCOUNT_RATE: Decimal = dec!(0.10);

/// One cart line as the calculator sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItem {
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl LineItem {
    pub fn new(unit_price: Decimal, quantity: i32) -> Self {
        Self {
            unit_price,
            quantity,
        }
    }
}

/// Monetary breakdown of a cart. `total == subtotal - discount + shipping`,
/// every field rounded to two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Computes the line subtotal for one item. `None` when the product of
/// price and quantity is not representable.
pub fn line_subtotal(unit_price: Decimal, quantity: i32) -> Option<Decimal> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .map(|s| s.round_dp(2))
}

/// Prices a cart. Callers are responsible for rejecting negative prices and
/// non-positive quantities; amounts that overflow the decimal range yield
/// `None`.
pub fn price_cart(items: &[LineItem]) -> Option<Pricing> {
    let mut subtotal = Decimal::ZERO;
    for item in items {
        let line = line_subtotal(item.unit_price, item.quantity)?;
        subtotal = subtotal.checked_add(line)?;
    }
    let subtotal = subtotal.round_dp(2);

    let shipping = if items.is_empty() {
        Decimal::ZERO
    } else {
        FLAT_SHIPPING_FEE
    };

    let discount = if subtotal > DISCOUNT_THRESHOLD {
        subtotal.checked_mul(DISCOUNT_RATE)?.round_dp(2)
    } else {
        Decimal::ZERO
    };

    let total = (subtotal - discount).checked_add(shipping)?.round_dp(2);

    Some(Pricing {
        subtotal,
        shipping,
        discount,
        total,
    })
}
