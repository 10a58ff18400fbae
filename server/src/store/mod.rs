//! Persistence capabilities consumed by the order and event services.
//!
//! Every mutating workflow runs inside one [`UnitOfWork`]: a transaction-scoped
//! handle obtained from [`Database::begin`]. Dropping a unit of work without
//! calling [`UnitOfWork::commit`] rolls it back and releases any row locks it
//! holds.

use async_trait::async_trait;

use crate::models::event::{Event, OrderRuleDay, OrderRuleRangeDate, Show};
use crate::models::order::{Item, Order};
use crate::models::ticket::TicketStock;
use crate::utils::error::AppResult;

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgDatabase;

/// Per-event sale window and sale days.
#[async_trait]
pub trait SalesRuleStore: Send {
    async fn find_rule_range_date(&mut self, event_id: &str) -> AppResult<OrderRuleRangeDate>;
    async fn find_rule_days(&mut self, event_id: &str) -> AppResult<Vec<OrderRuleDay>>;
}

#[async_trait]
pub trait EntitlementStore: Send {
    async fn count_acquired_tickets(&mut self, event_id: &str, customer_id: i64) -> AppResult<i64>;
}

#[async_trait]
pub trait CatalogStore: Send {
    async fn find_event(&mut self, id: &str) -> AppResult<Event>;
    async fn find_show(&mut self, id: &str) -> AppResult<Show>;
    /// Persists a freshly authored event with its artists, promotors, shows,
    /// locations, ticket stocks and sale rules.
    async fn save_event(&mut self, event: &Event) -> AppResult<()>;
}

/// The contended ticket stock rows.
#[async_trait]
pub trait InventoryStore: Send {
    /// Loads a stock row and holds an exclusive lock on it until the enclosing
    /// unit of work commits or rolls back.
    async fn find_ticket_stock_for_update(&mut self, id: &str) -> AppResult<TicketStock>;
    async fn update_ticket_stock(&mut self, stock: &TicketStock) -> AppResult<()>;
}

#[async_trait]
pub trait OrderStore: Send {
    /// Loads an order and locks its row until the unit of work ends, so
    /// status transitions on one order are serialized.
    async fn find_order(&mut self, id: &str) -> AppResult<Order>;
    async fn find_order_items(&mut self, order_id: &str) -> AppResult<Vec<Item>>;
    /// Inserts the order row and every one of its items.
    async fn save_order(&mut self, order: &Order) -> AppResult<()>;
    /// Moves a `WAITING_FOR_PAYMENT` order to its new status. Fails when the
    /// stored order has already left that status.
    async fn update_order_status(&mut self, order: &Order) -> AppResult<()>;
}

#[async_trait]
pub trait UnitOfWork:
    SalesRuleStore + EntitlementStore + CatalogStore + InventoryStore + OrderStore + Send
{
    async fn commit(self: Box<Self>) -> AppResult<()>;
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

#[async_trait]
pub trait Database: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;

    async fn count_orders(&self, customer_id: i64) -> AppResult<i64>;
    /// Newest first.
    async fn find_orders(&self, customer_id: i64, offset: i64, limit: i64)
        -> AppResult<Vec<Order>>;
    async fn find_order_items(&self, order_id: &str) -> AppResult<Vec<Item>>;
}
