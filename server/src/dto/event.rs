use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::dto::{invalid_field, validation_result};
use crate::models::event::{Event, Location, Show, ShowType, AUTHORABLE_TIERS};
use crate::models::ticket::TicketStock;
use crate::utils::error::AppResult;

/// Local datetime layout used by the admin app.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn parse_local_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), DATETIME_FORMAT).ok()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateLocationRequest {
    pub country: String,
    pub city: String,
    pub formatted_address: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateTicketAllocation {
    pub tier: String,
    pub allocation_by_percentage: f64,
    pub price: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateShowRequest {
    pub venue: String,
    #[serde(rename = "type")]
    pub show_type: String,
    /// Also stream this show and sell an online pool for it.
    pub online: bool,
    pub location: Option<CreateLocationRequest>,
    pub total_ticket_allocation: i64,
    pub ticket_allocation: Vec<CreateTicketAllocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatePromotorRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderRuleRangeDateRequest {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateEventRequest {
    pub name: String,
    pub description: String,
    pub artists: Vec<String>,
    pub promotors: Vec<CreatePromotorRequest>,
    pub online_ticket_price: Decimal,
    pub total_online_ticket_allocation: i64,
    pub shows: Vec<CreateShowRequest>,
    pub show_time: String,
    pub order_rule_day: Vec<i32>,
    pub order_rule_range_date: OrderRuleRangeDateRequest,
}

impl CreateEventRequest {
    fn needs_online_pool(&self) -> bool {
        self.shows.iter().any(|show| show.online)
    }

    pub fn validate(&self) -> AppResult<()> {
        let mut messages = Vec::new();

        if self.name.trim().is_empty() {
            messages.push(invalid_field("name", &self.name));
        }
        if self.description.trim().is_empty() {
            messages.push(invalid_field("description", &self.description));
        }
        if self.artists.is_empty() {
            messages.push(invalid_field("artists", "[]"));
        }
        for (i, artist) in self.artists.iter().enumerate() {
            if artist.trim().is_empty() {
                messages.push(invalid_field(&format!("artists[{}]", i), artist));
            }
        }

        if self.promotors.is_empty() {
            messages.push(invalid_field("promotors", "[]"));
        }
        for (i, promotor) in self.promotors.iter().enumerate() {
            if promotor.name.trim().is_empty() {
                messages.push(invalid_field(&format!("promotors[{}].name", i), &promotor.name));
            }
            if !looks_like_email(&promotor.email) {
                messages.push(invalid_field(&format!("promotors[{}].email", i), &promotor.email));
            }
            if promotor.phone.trim().is_empty() {
                messages.push(invalid_field(&format!("promotors[{}].phone", i), &promotor.phone));
            }
        }

        if self.needs_online_pool() {
            if self.online_ticket_price <= Decimal::ZERO {
                messages.push(invalid_field("online_ticket_price", self.online_ticket_price));
            }
            if self.total_online_ticket_allocation < 1 {
                messages.push(invalid_field(
                    "total_online_ticket_allocation",
                    self.total_online_ticket_allocation,
                ));
            }
        }

        if self.shows.is_empty() {
            messages.push(invalid_field("shows", "[]"));
        }
        for (i, show) in self.shows.iter().enumerate() {
            validate_show(i, show, &mut messages);
        }

        if parse_local_datetime(&self.show_time).is_none() {
            messages.push(invalid_field("show_time", &self.show_time));
        }

        let range = &self.order_rule_range_date;
        let start = parse_local_datetime(&range.start_date);
        let end = parse_local_datetime(&range.end_date);
        if start.is_none() {
            messages.push(invalid_field("order_rule_range_date.start_date", &range.start_date));
        }
        if end.is_none() {
            messages.push(invalid_field("order_rule_range_date.end_date", &range.end_date));
        }
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                messages.push(invalid_field("order_rule_range_date.end_date", &range.end_date));
            }
        }

        for (i, day) in self.order_rule_day.iter().enumerate() {
            if !(1..=7).contains(day) {
                messages.push(invalid_field(&format!("order_rule_day[{}]", i), day));
            }
        }

        validation_result(messages)
    }
}

fn validate_show(i: usize, show: &CreateShowRequest, messages: &mut Vec<String>) {
    if show.venue.trim().is_empty() {
        messages.push(invalid_field(&format!("shows[{}].venue", i), &show.venue));
    }
    match ShowType::parse(&show.show_type) {
        Some(ShowType::Live) | Some(ShowType::HologramLive) => {}
        _ => messages.push(invalid_field(&format!("shows[{}].type", i), &show.show_type)),
    }
    if let Some(location) = &show.location {
        if location.country.trim().is_empty() {
            messages.push(invalid_field(
                &format!("shows[{}].location.country", i),
                &location.country,
            ));
        }
        if location.city.trim().is_empty() {
            messages.push(invalid_field(&format!("shows[{}].location.city", i), &location.city));
        }
    }
    if show.total_ticket_allocation < 1 {
        messages.push(invalid_field(
            &format!("shows[{}].total_ticket_allocation", i),
            show.total_ticket_allocation,
        ));
    }
    if show.ticket_allocation.is_empty() {
        messages.push(invalid_field(&format!("shows[{}].ticket_allocation", i), "[]"));
    }
    for (j, allocation) in show.ticket_allocation.iter().enumerate() {
        let field = format!("shows[{}].ticket_allocation[{}]", i, j);
        if !AUTHORABLE_TIERS.contains(&allocation.tier.as_str()) {
            messages.push(invalid_field(&format!("{}.tier", field), &allocation.tier));
        }
        if !(allocation.allocation_by_percentage > 0.0
            && allocation.allocation_by_percentage <= 100.0)
        {
            messages.push(invalid_field(
                &format!("{}.allocation_by_percentage", field),
                allocation.allocation_by_percentage,
            ));
        }
        if allocation.price <= Decimal::ZERO {
            messages.push(invalid_field(&format!("{}.price", field), allocation.price));
        }
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromotorResponse {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationResponse {
    pub country: String,
    pub city: String,
    pub formatted_address: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&Location> for LocationResponse {
    fn from(location: &Location) -> Self {
        Self {
            country: location.country.clone(),
            city: location.city.clone(),
            formatted_address: location.formatted_address.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketStockResponse {
    pub id: String,
    pub tier: String,
    pub online_for: Option<String>,
    pub allocation: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub acquired: i64,
}

impl From<&TicketStock> for TicketStockResponse {
    fn from(stock: &TicketStock) -> Self {
        Self {
            id: stock.id.clone(),
            tier: stock.tier.clone(),
            online_for: stock.online_for.clone(),
            allocation: stock.allocation,
            price: stock.price,
            acquired: stock.acquired,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShowResponse {
    pub id: String,
    pub venue: String,
    #[serde(rename = "type")]
    pub show_type: String,
    pub location: Option<LocationResponse>,
    pub time: DateTime<Utc>,
    pub status: String,
    pub ticket_stocks: Vec<TicketStockResponse>,
}

impl From<&Show> for ShowResponse {
    fn from(show: &Show) -> Self {
        Self {
            id: show.id.clone(),
            venue: show.venue.clone(),
            show_type: show.show_type.as_str().to_string(),
            location: show.location.as_ref().map(LocationResponse::from),
            time: show.time,
            status: show.status.clone(),
            ticket_stocks: show.ticket_stocks.iter().map(TicketStockResponse::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: String,
    pub promotors: Vec<PromotorResponse>,
    pub artists: Vec<String>,
    pub shows: Vec<ShowResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Event> for EventResponse {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            name: event.name.clone(),
            description: event.description.clone(),
            status: event.status.clone(),
            promotors: event
                .promotors
                .iter()
                .map(|p| PromotorResponse {
                    name: p.name.clone(),
                    email: p.email.clone(),
                    phone: p.phone.clone(),
                })
                .collect(),
            artists: event.artists.iter().map(|a| a.name.clone()).collect(),
            shows: event.shows.iter().map(ShowResponse::from).collect(),
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}
