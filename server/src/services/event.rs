use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use tracing::info;

use crate::dto::event::{parse_local_datetime, CreateEventRequest, EventResponse};
use crate::dto::invalid_field;
use crate::models::event::{
    Artist, Event, Location, OrderRuleAggregation, OrderRuleDay, OrderRuleRangeDate, Promotor,
    Show, ShowType, EVENT_STATUS_ACTIVE, SHOW_STATUS_ACTIVE, TICKET_TIER_BRONZE, VENUE_ONLINE,
};
use crate::models::ticket::TicketStock;
use crate::services::with_timeout;
use crate::store::{CatalogStore, Database};
use crate::utils::error::{AppError, AppResult};
use crate::utils::id::timestamp_with_prefix;

pub const EVENT_ID_PREFIX: &str = "EVENT";
pub const SHOW_ID_PREFIX: &str = "SHOW";
pub const TICKET_STOCK_ID_PREFIX: &str = "TSTK";

/// Admin-side event authoring.
pub struct EventService {
    db: Arc<dyn Database>,
    timeout: Duration,
    utc_offset: FixedOffset,
}

impl EventService {
    pub fn new(db: Arc<dyn Database>, timeout: Duration, utc_offset: FixedOffset) -> Self {
        Self {
            db,
            timeout,
            utc_offset,
        }
    }

    pub async fn create_event(&self, request: CreateEventRequest) -> AppResult<EventResponse> {
        with_timeout(self.timeout, self.create(request)).await
    }

    async fn create(&self, request: CreateEventRequest) -> AppResult<EventResponse> {
        request.validate()?;

        let event = build_event(&request, self.utc_offset, Utc::now())?;

        let mut uow = self.db.begin().await?;
        uow.save_event(&event).await?;
        uow.commit().await?;

        info!(
            event_id = %event.id,
            shows = event.shows.len(),
            "Event created"
        );

        Ok(EventResponse::from(&event))
    }
}

fn to_utc(
    field: &str,
    value: &str,
    utc_offset: FixedOffset,
) -> AppResult<DateTime<Utc>> {
    parse_local_datetime(value)
        .and_then(|naive: NaiveDateTime| utc_offset.from_local_datetime(&naive).single())
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| AppError::ValidationError(invalid_field(field, value)))
}

/// Share of `total` for a percentage, rounded half away from zero.
fn allocation_share(percentage: f64, total: i64) -> i64 {
    (percentage / 100.0 * total as f64).round() as i64
}

/// Expands an authoring request into the full aggregate: live shows with their
/// tier pools, plus an online companion show for each show streamed online.
pub fn build_event(
    request: &CreateEventRequest,
    utc_offset: FixedOffset,
    now: DateTime<Utc>,
) -> AppResult<Event> {
    let event_id = timestamp_with_prefix(EVENT_ID_PREFIX, now);
    let show_time = to_utc("show_time", &request.show_time, utc_offset)?;
    let start_date = to_utc(
        "order_rule_range_date.start_date",
        &request.order_rule_range_date.start_date,
        utc_offset,
    )?;
    let end_date = to_utc(
        "order_rule_range_date.end_date",
        &request.order_rule_range_date.end_date,
        utc_offset,
    )?;

    // Online seats are split evenly over every requested show.
    let online_percentage = 100.0 / request.shows.len().max(1) as f64;

    let mut shows = Vec::with_capacity(request.shows.len());
    for show_request in &request.shows {
        let show_type = ShowType::parse(&show_request.show_type).ok_or_else(|| {
            AppError::ValidationError(invalid_field("type", &show_request.show_type))
        })?;
        let show_id = timestamp_with_prefix(SHOW_ID_PREFIX, now);
        let location_for = |show_id: &str| {
            show_request.location.as_ref().map(|l| Location {
                event_id: event_id.clone(),
                show_id: show_id.to_string(),
                country: l.country.clone(),
                city: l.city.clone(),
                formatted_address: l.formatted_address.clone(),
                latitude: l.latitude,
                longitude: l.longitude,
            })
        };

        let ticket_stocks = show_request
            .ticket_allocation
            .iter()
            .map(|allocation| TicketStock {
                event_id: event_id.clone(),
                show_id: show_id.clone(),
                id: timestamp_with_prefix(TICKET_STOCK_ID_PREFIX, now),
                online_for: None,
                tier: allocation.tier.clone(),
                allocation: allocation_share(
                    allocation.allocation_by_percentage,
                    show_request.total_ticket_allocation,
                ),
                price: allocation.price,
                acquired: 0,
                last_stock_update: now,
            })
            .collect();

        let live_show = Show {
            event_id: event_id.clone(),
            id: show_id.clone(),
            venue: show_request.venue.clone(),
            show_type,
            ticket_stocks,
            location: location_for(&show_id),
            time: show_time,
            status: SHOW_STATUS_ACTIVE.to_string(),
        };
        shows.push(live_show);

        if show_request.online {
            let online_show_id = timestamp_with_prefix(SHOW_ID_PREFIX, now);
            shows.push(Show {
                event_id: event_id.clone(),
                id: online_show_id.clone(),
                venue: VENUE_ONLINE.to_string(),
                show_type: ShowType::Online,
                ticket_stocks: vec![TicketStock {
                    event_id: event_id.clone(),
                    show_id: online_show_id.clone(),
                    id: timestamp_with_prefix(TICKET_STOCK_ID_PREFIX, now),
                    online_for: Some(show_id.clone()),
                    tier: TICKET_TIER_BRONZE.to_string(),
                    allocation: allocation_share(
                        online_percentage,
                        request.total_online_ticket_allocation,
                    ),
                    price: request.online_ticket_price,
                    acquired: 0,
                    last_stock_update: now,
                }],
                location: location_for(&online_show_id),
                time: show_time,
                status: SHOW_STATUS_ACTIVE.to_string(),
            });
        }
    }

    Ok(Event {
        id: event_id.clone(),
        name: request.name.clone(),
        description: request.description.clone(),
        status: EVENT_STATUS_ACTIVE.to_string(),
        promotors: request
            .promotors
            .iter()
            .map(|p| Promotor {
                event_id: event_id.clone(),
                name: p.name.clone(),
                email: p.email.clone(),
                phone: p.phone.clone(),
            })
            .collect(),
        artists: request
            .artists
            .iter()
            .map(|name| Artist {
                event_id: event_id.clone(),
                name: name.clone(),
            })
            .collect(),
        shows,
        order_rules: Some(OrderRuleAggregation {
            range_date: OrderRuleRangeDate {
                event_id: event_id.clone(),
                start_date,
                end_date,
            },
            days: request
                .order_rule_day
                .iter()
                .map(|day| OrderRuleDay {
                    event_id: event_id.clone(),
                    day: *day,
                })
                .collect(),
        }),
        created_at: now,
        updated_at: now,
    })
}
