use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

pub const ORDER_ID_PREFIX: &str = "TO";

/// Order lifecycle. `Paid` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    WaitingForPayment,
    Paid,
    Expired,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::WaitingForPayment => "WAITING_FOR_PAYMENT",
            OrderStatus::Paid => "PAID",
            OrderStatus::Expired => "EXPIRED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "WAITING_FOR_PAYMENT" => Some(OrderStatus::WaitingForPayment),
            "PAID" => Some(OrderStatus::Paid),
            "EXPIRED" => Some(OrderStatus::Expired),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::WaitingForPayment)
    }
}

/// One order line; denormalized for display and immutable once saved.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: i64,
    pub order_id: String,
    pub ticket_stock_id: String,
    pub show_id: String,
    pub event_id: String,
    pub event_name: String,
    pub show_venue: String,
    pub tier: String,
    pub price: Decimal,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: String,
    pub payment_method: String,
    pub virtual_account: Option<String>,
    pub transaction_id: Option<String>,
    pub status: OrderStatus,
    pub customer_id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub tax_percentage: Decimal,
    pub service_charge_percentage: Decimal,
    pub discount_percentage: Decimal,
    pub service_charge: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub items: Vec<Item>,
    pub subtotal: Decimal,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Settles a pending order. Returns `false` when the order is already
    /// terminal, leaving it untouched.
    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = OrderStatus::Paid;
        self.updated_at = now;
        true
    }

    /// Expires a pending order. A paid order always wins over expiry.
    pub fn mark_expired(&mut self, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = OrderStatus::Expired;
        self.updated_at = now;
        true
    }

    pub fn apply_pricing(&mut self, pricing: &Pricing) {
        self.subtotal = pricing.subtotal;
        self.service_charge = pricing.service_charge;
        self.tax = pricing.tax;
        self.total_amount = pricing.total;
    }
}

/// Monetary breakdown of a single-line order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pricing {
    pub subtotal: Decimal,
    pub service_charge: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl Pricing {
    pub fn compute(
        price: Decimal,
        quantity: i64,
        service_charge_percentage: Decimal,
        tax_percentage: Decimal,
    ) -> Self {
        let subtotal = price * Decimal::from(quantity);
        let service_charge = subtotal * service_charge_percentage / Decimal::ONE_HUNDRED;
        let tax = subtotal * tax_percentage / Decimal::ONE_HUNDRED;

        // Charged as an integer amount, halves round away from zero.
        let total = (subtotal + service_charge + tax)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

        Self {
            subtotal,
            service_charge,
            tax,
            total,
        }
    }

    pub fn gross_amount(&self) -> AppResult<i64> {
        self.total.to_i64().ok_or_else(|| {
            AppError::InternalServerError(format!(
                "order total '{}' cannot be charged",
                self.total
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn pending_order() -> Order {
        let now = Utc::now();
        Order {
            id: "TO1".into(),
            payment_method: "bca".into(),
            virtual_account: None,
            transaction_id: None,
            status: OrderStatus::WaitingForPayment,
            customer_id: 7,
            customer_name: "Ayu".into(),
            customer_email: "ayu@example.com".into(),
            tax_percentage: dec("10"),
            service_charge_percentage: dec("5"),
            discount_percentage: Decimal::ZERO,
            service_charge: Decimal::ZERO,
            tax: Decimal::ZERO,
            discount: Decimal::ZERO,
            items: vec![],
            subtotal: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_pricing_breakdown() {
        let pricing = Pricing::compute(dec("100000"), 1, dec("5"), dec("10"));
        assert_eq!(pricing.subtotal, dec("100000"));
        assert_eq!(pricing.service_charge, dec("5000"));
        assert_eq!(pricing.tax, dec("10000"));
        assert_eq!(pricing.total, dec("115000"));
        assert_eq!(pricing.gross_amount().unwrap(), 115000);
    }

    #[test]
    fn test_pricing_rounds_half_away_from_zero() {
        // 15 + 1.5 tax = 16.5
        let pricing = Pricing::compute(dec("15"), 1, Decimal::ZERO, dec("10"));
        assert_eq!(pricing.total, dec("17"));

        // 105 + 5.25 + 10.5 = 120.75
        let pricing = Pricing::compute(dec("105"), 1, dec("5"), dec("10"));
        assert_eq!(pricing.total, dec("121"));

        // 101 + 5.05 + 10.1 = 116.15
        let pricing = Pricing::compute(dec("101"), 1, dec("5"), dec("10"));
        assert_eq!(pricing.total, dec("116"));
    }

    #[test]
    fn test_pricing_scales_with_quantity() {
        let pricing = Pricing::compute(dec("250000"), 2, dec("5"), dec("10"));
        assert_eq!(pricing.subtotal, dec("500000"));
        assert_eq!(pricing.total, dec("575000"));
    }

    #[test]
    fn test_paid_is_terminal() {
        let mut order = pending_order();
        assert!(order.mark_paid(Utc::now()));
        assert!(!order.mark_paid(Utc::now()));
        assert!(!order.mark_expired(Utc::now()));
        assert_eq!(order.status, OrderStatus::Paid);
    }

    #[test]
    fn test_expired_is_terminal() {
        let mut order = pending_order();
        let expired_at = Utc::now();
        assert!(order.mark_expired(expired_at));
        assert!(!order.mark_expired(Utc::now()));
        assert!(!order.mark_paid(Utc::now()));
        assert_eq!(order.status, OrderStatus::Expired);
        assert_eq!(order.updated_at, expired_at);
    }

    #[test]
    fn test_status_labels() {
        for status in [
            OrderStatus::WaitingForPayment,
            OrderStatus::Paid,
            OrderStatus::Expired,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert!(!OrderStatus::WaitingForPayment.is_terminal());
        assert!(OrderStatus::Paid.is_terminal());
    }
}
