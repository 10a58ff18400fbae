use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ticket::TicketStock;

pub const EVENT_STATUS_ACTIVE: &str = "ACTIVE";
pub const SHOW_STATUS_ACTIVE: &str = "ACTIVE";
pub const VENUE_ONLINE: &str = "ONLINE";

pub const TICKET_TIER_ONLINE: &str = "ONLINE";
pub const TICKET_TIER_WOOD: &str = "WOOD";
pub const TICKET_TIER_BRONZE: &str = "BRONZE";
pub const TICKET_TIER_SILVER: &str = "SILVER";
pub const TICKET_TIER_GOLD: &str = "GOLD";

/// Tiers an administrator may allocate on a live show.
pub const AUTHORABLE_TIERS: [&str; 4] = [
    TICKET_TIER_WOOD,
    TICKET_TIER_BRONZE,
    TICKET_TIER_SILVER,
    TICKET_TIER_GOLD,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShowType {
    Live,
    HologramLive,
    Online,
}

impl ShowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShowType::Live => "LIVE",
            ShowType::HologramLive => "HOLOGRAM_LIVE",
            ShowType::Online => "ONLINE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "LIVE" => Some(ShowType::Live),
            "HOLOGRAM_LIVE" => Some(ShowType::HologramLive),
            "ONLINE" => Some(ShowType::Online),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub event_id: String,
    pub show_id: String,
    pub country: String,
    pub city: String,
    pub formatted_address: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Show {
    pub event_id: String,
    pub id: String,
    pub venue: String,
    pub show_type: ShowType,
    pub ticket_stocks: Vec<TicketStock>,
    pub location: Option<Location>,
    pub time: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Promotor {
    pub event_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artist {
    pub event_id: String,
    pub name: String,
}

/// Sale window: purchases are only accepted within `[start_date, end_date]`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRuleRangeDate {
    pub event_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// One allowed weekday, ISO numbered (1 = Monday .. 7 = Sunday).
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRuleDay {
    pub event_id: String,
    pub day: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRuleAggregation {
    pub range_date: OrderRuleRangeDate,
    pub days: Vec<OrderRuleDay>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: String,
    pub promotors: Vec<Promotor>,
    pub artists: Vec<Artist>,
    pub shows: Vec<Show>,
    /// `None` when only the event header was loaded.
    pub order_rules: Option<OrderRuleAggregation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
