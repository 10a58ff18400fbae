//! Doubles and fixtures shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;

use crate::clients::payment::{Charge, ChargeRequest, PaymentGateway};
use crate::clients::publisher::EventPublisher;
use crate::clients::scheduler::{HttpTask, TaskScheduler};
use crate::clients::session::{Audience, SessionStore};
use crate::dto::order::PlaceOrderRequest;
use crate::models::account::Account;
use crate::models::event::{
    Artist, Event, Location, OrderRuleAggregation, OrderRuleDay, OrderRuleRangeDate, Promotor,
    Show, ShowType, EVENT_STATUS_ACTIVE, SHOW_STATUS_ACTIVE,
};
use crate::models::ticket::TicketStock;
use crate::services::order::{OrderService, OrderSettings};
use crate::store::memory::MemoryDatabase;
use crate::utils::error::{AppError, AppResult};

#[derive(Default)]
pub struct FakeGateway {
    calls: Mutex<Vec<ChargeRequest>>,
    fail: AtomicBool,
    delay: Mutex<Duration>,
}

impl FakeGateway {
    pub fn calls(&self) -> Vec<ChargeRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_failure(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn charge(&self, request: &ChargeRequest) -> AppResult<Charge> {
        self.calls.lock().unwrap().push(request.clone());

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::ExternalServiceError(
                "payment gateway responded with 503".to_string(),
            ));
        }

        Ok(Charge {
            transaction_id: format!("trx-{}", request.transaction_details.order_id),
            transaction_status: "pending".to_string(),
            virtual_account: "8808123456789".to_string(),
        })
    }
}

#[derive(Default)]
pub struct RecordingScheduler {
    tasks: Mutex<Vec<(String, HttpTask, DateTime<Utc>)>>,
    fail: AtomicBool,
    delay: Mutex<Duration>,
}

impl RecordingScheduler {
    pub fn tasks(&self) -> Vec<(String, HttpTask, DateTime<Utc>)> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn set_failure(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl TaskScheduler for RecordingScheduler {
    async fn schedule_at(&self, queue: &str, task: HttpTask, when: DateTime<Utc>) -> AppResult<()> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::ExternalServiceError("queue unavailable".to_string()));
        }
        self.tasks
            .lock()
            .unwrap()
            .push((queue.to_string(), task, when));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<(String, String, Vec<u8>)>>,
    fail: AtomicBool,
}

impl RecordingPublisher {
    pub fn messages(&self) -> Vec<(String, String, Vec<u8>)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn set_failure(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        _headers: &[(String, String)],
        payload: &[u8],
    ) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::ExternalServiceError("stream unavailable".to_string()));
        }
        self.messages
            .lock()
            .unwrap()
            .push((topic.to_string(), key.to_string(), payload.to_vec()));
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticSessions {
    sessions: HashMap<String, (Audience, Account)>,
}

impl StaticSessions {
    pub fn with(mut self, audience: Audience, token: &str, account: Account) -> Self {
        self.sessions.insert(token.to_string(), (audience, account));
        self
    }
}

#[async_trait]
impl SessionStore for StaticSessions {
    async fn find_account(&self, audience: Audience, token: &str) -> AppResult<Option<Account>> {
        Ok(self
            .sessions
            .get(token)
            .filter(|(a, _)| *a == audience)
            .map(|(_, account)| account.clone()))
    }
}

pub fn customer(id: i64) -> Account {
    Account {
        id,
        name: format!("Customer {}", id),
        email: format!("customer{}@example.com", id),
    }
}

pub fn place_request() -> PlaceOrderRequest {
    PlaceOrderRequest {
        payment_method: "bca".into(),
        event_id: "EVENT1".into(),
        show_id: "SHOW1".into(),
        ticket_stock_id: "TSTK1".into(),
        quantity: 1,
    }
}

fn stock(event_id: &str, show_id: &str, id: &str, tier: &str, price: i64, now: DateTime<Utc>) -> TicketStock {
    TicketStock {
        event_id: event_id.into(),
        show_id: show_id.into(),
        id: id.into(),
        online_for: None,
        tier: tier.into(),
        allocation: 10,
        price: Decimal::from(price),
        acquired: 0,
        last_stock_update: now,
    }
}

fn show(event_id: &str, id: &str, venue: &str, stocks: Vec<TicketStock>, now: DateTime<Utc>) -> Show {
    Show {
        event_id: event_id.into(),
        id: id.into(),
        venue: venue.into(),
        show_type: ShowType::Live,
        ticket_stocks: stocks,
        location: Some(Location {
            event_id: event_id.into(),
            show_id: id.into(),
            country: "Indonesia".into(),
            city: "Jakarta".into(),
            formatted_address: "Jl. Pintu Satu Senayan".into(),
            latitude: -6.2186,
            longitude: 106.8022,
        }),
        time: now + chrono::Duration::days(60),
        status: SHOW_STATUS_ACTIVE.into(),
    }
}

fn event(id: &str, name: &str, shows: Vec<Show>, now: DateTime<Utc>) -> Event {
    let e = Event {
        id: id.into(),
        name: name.into(),
        description: "Satu malam, dua panggung".into(),
        status: EVENT_STATUS_ACTIVE.into(),
        promotors: vec![Promotor {
            event_id: id.into(),
            name: "Java Promo".into(),
            email: "ops@javapromo.id".into(),
            phone: "+62811000000".into(),
        }],
        artists: vec![Artist {
            event_id: id.into(),
            name: "Nadin".into(),
        }],
        shows,
        order_rules: None,
        created_at: now,
        updated_at: now,
    };
    with_rules(
        e,
        now - chrono::Duration::days(1),
        now + chrono::Duration::days(1),
        &[1, 2, 3, 4, 5, 6, 7],
    )
}

/// `EVENT1` on sale right now, every day:
/// `SHOW1` (GBK) sells `TSTK1` GOLD at 100000, `SHOW2` (JIS) sells `TSTK2`
/// SILVER at 50000. Both pools hold 10 units.
pub fn event_fixture(now: DateTime<Utc>) -> Event {
    let show1 = show(
        "EVENT1",
        "SHOW1",
        "GBK",
        vec![stock("EVENT1", "SHOW1", "TSTK1", "GOLD", 100000, now)],
        now,
    );
    let show2 = show(
        "EVENT1",
        "SHOW2",
        "JIS",
        vec![stock("EVENT1", "SHOW2", "TSTK2", "SILVER", 50000, now)],
        now,
    );
    event("EVENT1", "Konser Akhir Tahun", vec![show1, show2], now)
}

/// `EVENT2` with `SHOW3` selling `TSTK3`.
pub fn foreign_event_fixture(now: DateTime<Utc>) -> Event {
    let show3 = show(
        "EVENT2",
        "SHOW3",
        "Istora",
        vec![stock("EVENT2", "SHOW3", "TSTK3", "BRONZE", 75000, now)],
        now,
    );
    event("EVENT2", "Festival Jazz", vec![show3], now)
}

pub fn with_rules(mut event: Event, start: DateTime<Utc>, end: DateTime<Utc>, days: &[i32]) -> Event {
    event.order_rules = Some(OrderRuleAggregation {
        range_date: OrderRuleRangeDate {
            event_id: event.id.clone(),
            start_date: start,
            end_date: end,
        },
        days: days
            .iter()
            .map(|day| OrderRuleDay {
                event_id: event.id.clone(),
                day: *day,
            })
            .collect(),
    });
    event
}

pub fn set_stock(event: &mut Event, stock_id: &str, allocation: i64, acquired: i64) {
    for show in &mut event.shows {
        for stock in &mut show.ticket_stocks {
            if stock.id == stock_id {
                stock.allocation = allocation;
                stock.acquired = acquired;
            }
        }
    }
}

pub fn jakarta() -> FixedOffset {
    FixedOffset::east_opt(7 * 3600).unwrap()
}

/// An [`OrderService`] over the in-memory store with both fixture events
/// loaded.
pub struct Harness {
    pub db: MemoryDatabase,
    pub gateway: Arc<FakeGateway>,
    pub scheduler: Arc<RecordingScheduler>,
    pub publisher: Arc<RecordingPublisher>,
    pub orders: Arc<OrderService>,
}

impl Harness {
    pub fn settings() -> OrderSettings {
        OrderSettings {
            timeout: Duration::from_secs(5),
            base_url: "http://localhost:3001".to_string(),
            order_expire: chrono::Duration::minutes(15),
            service_charge_percentage: Decimal::from(5),
            tax_percentage: Decimal::from(10),
            utc_offset: jakarta(),
        }
    }

    pub async fn new() -> Self {
        Self::with_settings(Self::settings()).await
    }

    pub async fn with_settings(settings: OrderSettings) -> Self {
        let now = Utc::now();
        let db = MemoryDatabase::new();
        db.insert_event(&event_fixture(now)).await;
        db.insert_event(&foreign_event_fixture(now)).await;

        let gateway = Arc::new(FakeGateway::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        let publisher = Arc::new(RecordingPublisher::default());
        let orders = Arc::new(OrderService::new(
            Arc::new(db.clone()),
            gateway.clone(),
            scheduler.clone(),
            publisher.clone(),
            settings,
        ));

        Self {
            db,
            gateway,
            scheduler,
            publisher,
            orders,
        }
    }
}
