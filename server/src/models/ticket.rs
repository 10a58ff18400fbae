use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::utils::error::{AppError, AppResult};

/// A sellable pool of tickets for one tier of one show.
///
/// `0 <= acquired <= allocation` holds for every persisted row.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketStock {
    pub event_id: String,
    pub show_id: String,
    pub id: String,
    /// Live show this online pool was derived from, if any.
    pub online_for: Option<String>,
    pub tier: String,
    pub allocation: i64,
    pub price: Decimal,
    pub acquired: i64,
    pub last_stock_update: DateTime<Utc>,
}

impl TicketStock {
    pub fn remaining(&self) -> i64 {
        self.allocation - self.acquired
    }

    /// Takes `quantity` units out of the pool. On rejection the row is left
    /// untouched.
    pub fn reserve(&mut self, quantity: i64, now: DateTime<Utc>) -> AppResult<()> {
        if quantity < 1 {
            return Err(AppError::ValidationError(format!(
                "invalid 'quantity' with value '{}'",
                quantity
            )));
        }

        if quantity > self.remaining() {
            return Err(AppError::ValidationError("out of stock".to_string()));
        }

        self.acquired += quantity;
        self.last_stock_update = now;

        Ok(())
    }
}

/// Entitlement read model, written by ticket fulfilment.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquiredTicket {
    pub event_id: String,
    pub customer_id: i64,
    pub ticket_stock_id: String,
    pub order_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(allocation: i64, acquired: i64) -> TicketStock {
        TicketStock {
            event_id: "EVENT1".into(),
            show_id: "SHOW1".into(),
            id: "TSTK1".into(),
            online_for: None,
            tier: "GOLD".into(),
            allocation,
            price: Decimal::from(100000),
            acquired,
            last_stock_update: DateTime::<Utc>::MIN_UTC,
        }
    }

    #[test]
    fn test_reserve_fills_last_unit() {
        let now = Utc::now();
        let mut ts = stock(10, 9);
        ts.reserve(1, now).unwrap();
        assert_eq!(ts.acquired, 10);
        assert_eq!(ts.remaining(), 0);
        assert_eq!(ts.last_stock_update, now);
    }

    #[test]
    fn test_reserve_rejects_overflow_without_mutation() {
        let mut ts = stock(10, 10);
        let err = ts.reserve(1, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(ref m) if m == "out of stock"));
        assert_eq!(ts.acquired, 10);
        assert_eq!(ts.last_stock_update, DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn test_reserve_checks_general_quantity() {
        let mut ts = stock(10, 8);
        assert!(ts.reserve(3, Utc::now()).is_err());
        assert!(ts.reserve(2, Utc::now()).is_ok());
        assert_eq!(ts.acquired, 10);
    }

    #[test]
    fn test_reserve_rejects_non_positive_quantity() {
        let mut ts = stock(10, 0);
        assert!(ts.reserve(0, Utc::now()).is_err());
        assert_eq!(ts.acquired, 0);
    }
}
