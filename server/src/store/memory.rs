//! In-process [`Database`] used by the test-suite.
//!
//! Writes are staged on the unit of work and applied on commit. Row locks are
//! per-id async mutexes held by the unit of work, so a dropped or rolled back
//! unit of work releases its locks and discards its writes, the same way a
//! Postgres transaction does.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::event::{Event, OrderRuleDay, OrderRuleRangeDate, Show};
use crate::models::order::{Item, Order};
use crate::models::ticket::{AcquiredTicket, TicketStock};
use crate::store::{
    CatalogStore, Database, EntitlementStore, InventoryStore, OrderStore, SalesRuleStore,
    UnitOfWork,
};
use crate::utils::error::{AppError, AppResult};

#[derive(Default)]
struct Tables {
    events: HashMap<String, Event>,
    shows: HashMap<String, Show>,
    stocks: HashMap<String, TicketStock>,
    range_dates: HashMap<String, OrderRuleRangeDate>,
    days: HashMap<String, Vec<OrderRuleDay>>,
    acquired: Vec<AcquiredTicket>,
    orders: HashMap<String, Order>,
    items: HashMap<String, Vec<Item>>,
    next_item_id: i64,
}

impl Tables {
    fn insert_event(&mut self, event: &Event) {
        let mut header = event.clone();
        header.shows = Vec::new();
        header.order_rules = None;

        for show in &event.shows {
            for stock in &show.ticket_stocks {
                self.stocks.insert(stock.id.clone(), stock.clone());
            }
            let mut show_header = show.clone();
            show_header.ticket_stocks = Vec::new();
            self.shows.insert(show.id.clone(), show_header);
        }

        if let Some(rules) = &event.order_rules {
            self.range_dates
                .insert(event.id.clone(), rules.range_date.clone());
            self.days.insert(event.id.clone(), rules.days.clone());
        }

        self.events.insert(event.id.clone(), header);
    }

    fn insert_order(&mut self, order: &Order) -> AppResult<()> {
        if self.orders.contains_key(&order.id) {
            return Err(AppError::InternalServerError(format!(
                "duplicate order id '{}'",
                order.id
            )));
        }

        let mut items = Vec::with_capacity(order.items.len());
        for item in &order.items {
            self.next_item_id += 1;
            let mut item = item.clone();
            item.id = self.next_item_id;
            items.push(item);
        }

        let mut header = order.clone();
        header.items = Vec::new();
        self.orders.insert(order.id.clone(), header);
        self.items.insert(order.id.clone(), items);

        Ok(())
    }
}

enum Write {
    Event(Event),
    Stock(TicketStock),
    NewOrder(Order),
    OrderStatus(Order),
}

#[derive(Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<Tables>>,
    row_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
    fail_commit: Arc<AtomicBool>,
    fail_count: Arc<AtomicBool>,
    fail_list: Arc<AtomicBool>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_event(&self, event: &Event) {
        self.tables.lock().await.insert_event(event);
    }

    pub async fn insert_acquired_ticket(&self, ticket: AcquiredTicket) {
        self.tables.lock().await.acquired.push(ticket);
    }

    pub async fn ticket_stock(&self, id: &str) -> Option<TicketStock> {
        self.tables.lock().await.stocks.get(id).cloned()
    }

    /// Committed order with its items attached.
    pub async fn order(&self, id: &str) -> Option<Order> {
        let tables = self.tables.lock().await;
        let mut order = tables.orders.get(id).cloned()?;
        order.items = tables.items.get(id).cloned().unwrap_or_default();
        Some(order)
    }

    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    pub async fn event(&self, id: &str) -> Option<Event> {
        self.tables.lock().await.events.get(id).cloned()
    }

    pub async fn show(&self, id: &str) -> Option<Show> {
        self.tables.lock().await.shows.get(id).cloned()
    }

    /// Makes every subsequent commit fail until reset.
    pub fn set_commit_failure(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst);
    }

    /// Makes `count_orders` fail.
    pub fn set_count_failure(&self, fail: bool) {
        self.fail_count.store(fail, Ordering::SeqCst);
    }

    /// Makes `find_orders` fail.
    pub fn set_list_failure(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        Ok(Box::new(MemoryUnitOfWork {
            db: self.clone(),
            writes: Vec::new(),
            locked: HashSet::new(),
            guards: Vec::new(),
        }))
    }

    async fn count_orders(&self, customer_id: i64) -> AppResult<i64> {
        if self.fail_count.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        let tables = self.tables.lock().await;
        let count = tables
            .orders
            .values()
            .filter(|o| o.customer_id == customer_id)
            .count();
        Ok(count as i64)
    }

    async fn find_orders(
        &self,
        customer_id: i64,
        offset: i64,
        limit: i64,
    ) -> AppResult<Vec<Order>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        let tables = self.tables.lock().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.id.cmp(&a.id));

        Ok(orders
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn find_order_items(&self, order_id: &str) -> AppResult<Vec<Item>> {
        let tables = self.tables.lock().await;
        Ok(tables.items.get(order_id).cloned().unwrap_or_default())
    }
}

pub struct MemoryUnitOfWork {
    db: MemoryDatabase,
    writes: Vec<Write>,
    locked: HashSet<String>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl MemoryUnitOfWork {
    async fn lock_row(&mut self, key: String) {
        if self.locked.contains(&key) {
            return;
        }
        let lock = {
            let mut locks = self.db.row_locks.lock().await;
            locks.entry(key.clone()).or_default().clone()
        };
        self.guards.push(lock.lock_owned().await);
        self.locked.insert(key);
    }

    fn staged_stock(&self, id: &str) -> Option<TicketStock> {
        self.writes.iter().rev().find_map(|w| match w {
            Write::Stock(stock) if stock.id == id => Some(stock.clone()),
            _ => None,
        })
    }

    fn staged_order(&self, id: &str) -> Option<Order> {
        self.writes.iter().rev().find_map(|w| match w {
            Write::NewOrder(order) | Write::OrderStatus(order) if order.id == id => {
                Some(order.clone())
            }
            _ => None,
        })
    }
}

#[async_trait]
impl SalesRuleStore for MemoryUnitOfWork {
    async fn find_rule_range_date(&mut self, event_id: &str) -> AppResult<OrderRuleRangeDate> {
        let tables = self.db.tables.lock().await;
        tables.range_dates.get(event_id).cloned().ok_or_else(|| {
            AppError::NotFound(format!(
                "order rule range date's properties with id '{}' is not found",
                event_id
            ))
        })
    }

    async fn find_rule_days(&mut self, event_id: &str) -> AppResult<Vec<OrderRuleDay>> {
        let tables = self.db.tables.lock().await;
        Ok(tables.days.get(event_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl EntitlementStore for MemoryUnitOfWork {
    async fn count_acquired_tickets(&mut self, event_id: &str, customer_id: i64) -> AppResult<i64> {
        let tables = self.db.tables.lock().await;
        let count = tables
            .acquired
            .iter()
            .filter(|t| t.event_id == event_id && t.customer_id == customer_id)
            .count();
        Ok(count as i64)
    }
}

#[async_trait]
impl CatalogStore for MemoryUnitOfWork {
    async fn find_event(&mut self, id: &str) -> AppResult<Event> {
        let tables = self.db.tables.lock().await;
        tables.events.get(id).cloned().ok_or_else(|| {
            AppError::NotFound(format!("event's properties with id '{}' is not found", id))
        })
    }

    async fn find_show(&mut self, id: &str) -> AppResult<Show> {
        let tables = self.db.tables.lock().await;
        tables.shows.get(id).cloned().ok_or_else(|| {
            AppError::NotFound(format!(
                "event show's properties with id '{}' is not found",
                id
            ))
        })
    }

    async fn save_event(&mut self, event: &Event) -> AppResult<()> {
        self.writes.push(Write::Event(event.clone()));
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for MemoryUnitOfWork {
    async fn find_ticket_stock_for_update(&mut self, id: &str) -> AppResult<TicketStock> {
        self.lock_row(format!("ticket_stock:{}", id)).await;

        if let Some(stock) = self.staged_stock(id) {
            return Ok(stock);
        }

        let tables = self.db.tables.lock().await;
        tables.stocks.get(id).cloned().ok_or_else(|| {
            AppError::NotFound(format!(
                "ticket stock's properties with id '{}' is not found",
                id
            ))
        })
    }

    async fn update_ticket_stock(&mut self, stock: &TicketStock) -> AppResult<()> {
        self.writes.push(Write::Stock(stock.clone()));
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryUnitOfWork {
    async fn find_order(&mut self, id: &str) -> AppResult<Order> {
        self.lock_row(format!("ticket_order:{}", id)).await;

        if let Some(order) = self.staged_order(id) {
            return Ok(order);
        }

        let tables = self.db.tables.lock().await;
        tables.orders.get(id).cloned().ok_or_else(|| {
            AppError::NotFound(format!("order's properties with id '{}' is not found", id))
        })
    }

    async fn find_order_items(&mut self, order_id: &str) -> AppResult<Vec<Item>> {
        let tables = self.db.tables.lock().await;
        Ok(tables.items.get(order_id).cloned().unwrap_or_default())
    }

    async fn save_order(&mut self, order: &Order) -> AppResult<()> {
        self.writes.push(Write::NewOrder(order.clone()));
        Ok(())
    }

    async fn update_order_status(&mut self, order: &Order) -> AppResult<()> {
        self.writes.push(Write::OrderStatus(order.clone()));
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        if self.db.fail_commit.load(Ordering::SeqCst) {
            return Err(AppError::InternalServerError(
                "an error occurred trying to commit transaction".to_string(),
            ));
        }

        let mut tables = self.db.tables.lock().await;
        for write in &self.writes {
            if let Write::OrderStatus(order) = write {
                let waiting = tables
                    .orders
                    .get(&order.id)
                    .is_some_and(|row| !row.status.is_terminal());
                if !waiting {
                    return Err(AppError::InternalServerError(format!(
                        "order with id '{}' is no longer waiting for payment",
                        order.id
                    )));
                }
            }
        }

        for write in &self.writes {
            match write {
                Write::Event(event) => tables.insert_event(event),
                Write::Stock(stock) => {
                    tables.stocks.insert(stock.id.clone(), stock.clone());
                }
                Write::NewOrder(order) => tables.insert_order(order)?,
                Write::OrderStatus(order) => {
                    if let Some(row) = tables.orders.get_mut(&order.id) {
                        row.status = order.status;
                        row.updated_at = order.updated_at;
                    }
                }
            }
        }

        // Row locks are released once the writes are visible.
        drop(tables);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}
