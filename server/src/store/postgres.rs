use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{FromRow, Transaction};

use crate::models::event::{Event, OrderRuleDay, OrderRuleRangeDate, Show, ShowType};
use crate::models::order::{Item, Order, OrderStatus};
use crate::models::ticket::TicketStock;
use crate::store::{
    CatalogStore, Database, EntitlementStore, InventoryStore, OrderStore, SalesRuleStore,
    UnitOfWork,
};
use crate::utils::error::{AppError, AppResult};

const ORDER_COLUMNS: &str = "id, payment_method, transaction_id, virtual_account, status, \
    customer_id, customer_name, customer_email, tax_percentage, service_charge_percentage, \
    discount_percentage, service_charge, tax, discount, subtotal, total_amount, created_at, \
    updated_at";

const ITEM_COLUMNS: &str =
    "id, order_id, ticket_stock_id, tier, show_id, show_venue, event_id, event_name, price, quantity";

const TICKET_STOCK_COLUMNS: &str =
    "id, tier, allocation, price, acquired, last_stock_update, online_for, show_id, event_id";

#[derive(FromRow)]
struct OrderRow {
    id: String,
    payment_method: String,
    transaction_id: Option<String>,
    virtual_account: Option<String>,
    status: String,
    customer_id: i64,
    customer_name: String,
    customer_email: String,
    tax_percentage: Decimal,
    service_charge_percentage: Decimal,
    discount_percentage: Decimal,
    service_charge: Decimal,
    tax: Decimal,
    discount: Decimal,
    subtotal: Decimal,
    total_amount: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = OrderStatus::parse(&row.status).ok_or_else(|| {
            AppError::InternalServerError(format!(
                "order '{}' has an unknown status '{}'",
                row.id, row.status
            ))
        })?;

        Ok(Order {
            id: row.id,
            payment_method: row.payment_method,
            virtual_account: row.virtual_account,
            transaction_id: row.transaction_id,
            status,
            customer_id: row.customer_id,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            tax_percentage: row.tax_percentage,
            service_charge_percentage: row.service_charge_percentage,
            discount_percentage: row.discount_percentage,
            service_charge: row.service_charge,
            tax: row.tax,
            discount: row.discount,
            items: Vec::new(),
            subtotal: row.subtotal,
            total_amount: row.total_amount,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ItemRow {
    id: i64,
    order_id: String,
    ticket_stock_id: String,
    tier: String,
    show_id: String,
    show_venue: String,
    event_id: String,
    event_name: String,
    price: Decimal,
    quantity: i64,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: row.id,
            order_id: row.order_id,
            ticket_stock_id: row.ticket_stock_id,
            show_id: row.show_id,
            event_id: row.event_id,
            event_name: row.event_name,
            show_venue: row.show_venue,
            tier: row.tier,
            price: row.price,
            quantity: row.quantity,
        }
    }
}

#[derive(FromRow)]
struct TicketStockRow {
    id: String,
    tier: String,
    allocation: i64,
    price: Decimal,
    acquired: i64,
    last_stock_update: DateTime<Utc>,
    online_for: Option<String>,
    show_id: String,
    event_id: String,
}

impl From<TicketStockRow> for TicketStock {
    fn from(row: TicketStockRow) -> Self {
        TicketStock {
            event_id: row.event_id,
            show_id: row.show_id,
            id: row.id,
            online_for: row.online_for,
            tier: row.tier,
            allocation: row.allocation,
            price: row.price,
            acquired: row.acquired,
            last_stock_update: row.last_stock_update,
        }
    }
}

#[derive(FromRow)]
struct EventRow {
    id: String,
    name: String,
    description: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ShowRow {
    event_id: String,
    id: String,
    venue: String,
    #[sqlx(rename = "type")]
    show_type: String,
    time: DateTime<Utc>,
    status: String,
}

impl TryFrom<ShowRow> for Show {
    type Error = AppError;

    fn try_from(row: ShowRow) -> Result<Self, Self::Error> {
        let show_type = ShowType::parse(&row.show_type).ok_or_else(|| {
            AppError::InternalServerError(format!(
                "show '{}' has an unknown type '{}'",
                row.id, row.show_type
            ))
        })?;

        Ok(Show {
            event_id: row.event_id,
            id: row.id,
            venue: row.venue,
            show_type,
            ticket_stocks: Vec::new(),
            location: None,
            time: row.time,
            status: row.status,
        })
    }
}

#[derive(FromRow)]
struct RangeDateRow {
    event_id: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}

#[derive(FromRow)]
struct DayRow {
    event_id: String,
    day: i32,
}

/// Postgres-backed [`Database`].
#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn count_orders(&self, customer_id: i64) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT count(id) FROM ticket_order WHERE customer_id = $1",
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn find_orders(
        &self,
        customer_id: i64,
        offset: i64,
        limit: i64,
    ) -> AppResult<Vec<Order>> {
        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM ticket_order WHERE customer_id = $1 \
             ORDER BY id DESC OFFSET $2 LIMIT $3"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&query)
            .bind(customer_id)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn find_order_items(&self, order_id: &str) -> AppResult<Vec<Item>> {
        let query = format!("SELECT {ITEM_COLUMNS} FROM order_item WHERE order_id = $1 ORDER BY id");
        let rows = sqlx::query_as::<_, ItemRow>(&query)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Item::from).collect())
    }
}

/// One Postgres transaction. sqlx rolls the transaction back when it is
/// dropped uncommitted.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl SalesRuleStore for PgUnitOfWork {
    async fn find_rule_range_date(&mut self, event_id: &str) -> AppResult<OrderRuleRangeDate> {
        let row = sqlx::query_as::<_, RangeDateRow>(
            "SELECT event_id, start_date, end_date FROM order_rule_range_date \
             WHERE event_id = $1 LIMIT 1",
        )
        .bind(event_id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "order rule range date's properties with id '{}' is not found",
                event_id
            ))
        })?;

        Ok(OrderRuleRangeDate {
            event_id: row.event_id,
            start_date: row.start_date,
            end_date: row.end_date,
        })
    }

    async fn find_rule_days(&mut self, event_id: &str) -> AppResult<Vec<OrderRuleDay>> {
        let rows = sqlx::query_as::<_, DayRow>(
            "SELECT event_id, day FROM order_rule_day WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| OrderRuleDay {
                event_id: row.event_id,
                day: row.day,
            })
            .collect())
    }
}

#[async_trait]
impl EntitlementStore for PgUnitOfWork {
    async fn count_acquired_tickets(&mut self, event_id: &str, customer_id: i64) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT count(id) FROM acquired_ticket WHERE event_id = $1 AND customer_id = $2",
        )
        .bind(event_id)
        .bind(customer_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(count)
    }
}

#[async_trait]
impl CatalogStore for PgUnitOfWork {
    async fn find_event(&mut self, id: &str) -> AppResult<Event> {
        let row = sqlx::query_as::<_, EventRow>(
            "SELECT id, name, description, status, created_at, updated_at FROM event \
             WHERE id = $1 LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("event's properties with id '{}' is not found", id))
        })?;

        Ok(Event {
            id: row.id,
            name: row.name,
            description: row.description,
            status: row.status,
            promotors: Vec::new(),
            artists: Vec::new(),
            shows: Vec::new(),
            order_rules: None,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn find_show(&mut self, id: &str) -> AppResult<Show> {
        let row = sqlx::query_as::<_, ShowRow>(
            "SELECT event_id, id, venue, type, time, status FROM event_show \
             WHERE id = $1 LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "event show's properties with id '{}' is not found",
                id
            ))
        })?;

        Show::try_from(row)
    }

    async fn save_event(&mut self, event: &Event) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO event (id, name, description, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&event.id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.status)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&mut *self.tx)
        .await?;

        for artist in &event.artists {
            sqlx::query("INSERT INTO event_artist (event_id, name) VALUES ($1, $2)")
                .bind(&artist.event_id)
                .bind(&artist.name)
                .execute(&mut *self.tx)
                .await?;
        }

        for promotor in &event.promotors {
            sqlx::query(
                "INSERT INTO event_promotor (event_id, name, email, phone) VALUES ($1, $2, $3, $4)",
            )
            .bind(&promotor.event_id)
            .bind(&promotor.name)
            .bind(&promotor.email)
            .bind(&promotor.phone)
            .execute(&mut *self.tx)
            .await?;
        }

        for show in &event.shows {
            sqlx::query(
                "INSERT INTO event_show (event_id, id, venue, type, time, status) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(&show.event_id)
            .bind(&show.id)
            .bind(&show.venue)
            .bind(show.show_type.as_str())
            .bind(show.time)
            .bind(&show.status)
            .execute(&mut *self.tx)
            .await?;

            if let Some(location) = &show.location {
                sqlx::query(
                    "INSERT INTO event_show_location \
                     (event_id, show_id, country, city, formatted_address, latitude, longitude) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7)",
                )
                .bind(&location.event_id)
                .bind(&location.show_id)
                .bind(&location.country)
                .bind(&location.city)
                .bind(&location.formatted_address)
                .bind(location.latitude)
                .bind(location.longitude)
                .execute(&mut *self.tx)
                .await?;
            }

            for stock in &show.ticket_stocks {
                let query = format!(
                    "INSERT INTO ticket_stock ({TICKET_STOCK_COLUMNS}) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
                );
                sqlx::query(&query)
                    .bind(&stock.id)
                    .bind(&stock.tier)
                    .bind(stock.allocation)
                    .bind(stock.price)
                    .bind(stock.acquired)
                    .bind(stock.last_stock_update)
                    .bind(&stock.online_for)
                    .bind(&stock.show_id)
                    .bind(&stock.event_id)
                    .execute(&mut *self.tx)
                    .await?;
            }
        }

        let Some(rules) = &event.order_rules else {
            return Ok(());
        };

        let range_date = &rules.range_date;
        sqlx::query(
            "INSERT INTO order_rule_range_date (event_id, start_date, end_date) VALUES ($1, $2, $3)",
        )
        .bind(&range_date.event_id)
        .bind(range_date.start_date)
        .bind(range_date.end_date)
        .execute(&mut *self.tx)
        .await?;

        for rule in &rules.days {
            sqlx::query("INSERT INTO order_rule_day (event_id, day) VALUES ($1, $2)")
                .bind(&rule.event_id)
                .bind(rule.day)
                .execute(&mut *self.tx)
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl InventoryStore for PgUnitOfWork {
    async fn find_ticket_stock_for_update(&mut self, id: &str) -> AppResult<TicketStock> {
        let query = format!("SELECT {TICKET_STOCK_COLUMNS} FROM ticket_stock WHERE id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, TicketStockRow>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "ticket stock's properties with id '{}' is not found",
                    id
                ))
            })?;

        Ok(TicketStock::from(row))
    }

    async fn update_ticket_stock(&mut self, stock: &TicketStock) -> AppResult<()> {
        sqlx::query("UPDATE ticket_stock SET acquired = $1, last_stock_update = $2 WHERE id = $3")
            .bind(stock.acquired)
            .bind(stock.last_stock_update)
            .bind(&stock.id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl OrderStore for PgUnitOfWork {
    async fn find_order(&mut self, id: &str) -> AppResult<Order> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM ticket_order WHERE id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, OrderRow>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("order's properties with id '{}' is not found", id))
            })?;

        Order::try_from(row)
    }

    async fn find_order_items(&mut self, order_id: &str) -> AppResult<Vec<Item>> {
        let query = format!("SELECT {ITEM_COLUMNS} FROM order_item WHERE order_id = $1 ORDER BY id");
        let rows = sqlx::query_as::<_, ItemRow>(&query)
            .bind(order_id)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows.into_iter().map(Item::from).collect())
    }

    async fn save_order(&mut self, order: &Order) -> AppResult<()> {
        let query = format!(
            "INSERT INTO ticket_order ({ORDER_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"
        );
        sqlx::query(&query)
            .bind(&order.id)
            .bind(&order.payment_method)
            .bind(&order.transaction_id)
            .bind(&order.virtual_account)
            .bind(order.status.as_str())
            .bind(order.customer_id)
            .bind(&order.customer_name)
            .bind(&order.customer_email)
            .bind(order.tax_percentage)
            .bind(order.service_charge_percentage)
            .bind(order.discount_percentage)
            .bind(order.service_charge)
            .bind(order.tax)
            .bind(order.discount)
            .bind(order.subtotal)
            .bind(order.total_amount)
            .bind(order.created_at)
            .bind(order.updated_at)
            .execute(&mut *self.tx)
            .await?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_item \
                 (order_id, ticket_stock_id, show_id, event_id, event_name, show_venue, tier, price, quantity) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(&item.order_id)
            .bind(&item.ticket_stock_id)
            .bind(&item.show_id)
            .bind(&item.event_id)
            .bind(&item.event_name)
            .bind(&item.show_venue)
            .bind(&item.tier)
            .bind(item.price)
            .bind(item.quantity)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn update_order_status(&mut self, order: &Order) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE ticket_order SET status = $1, updated_at = $2 \
             WHERE id = $3 AND status = $4",
        )
        .bind(order.status.as_str())
        .bind(order.updated_at)
        .bind(&order.id)
        .bind(OrderStatus::WaitingForPayment.as_str())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InternalServerError(format!(
                "order with id '{}' is no longer waiting for payment",
                order.id
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
