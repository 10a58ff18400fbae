use std::sync::Arc;

use crate::clients::session::SessionStore;
use crate::services::{EventService, OrderService};

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService>,
    pub events: Arc<EventService>,
    pub sessions: Arc<dyn SessionStore>,
}
