use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;

use crate::dto::event::CreateEventRequest;
use crate::handlers::orders::json_body;
use crate::handlers::session::AdminSession;
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::response::created;

pub async fn create_event(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> AppResult<Response> {
    let request = json_body(payload)?;
    let event = state.events.create_event(request).await?;

    tracing::info!(event_id = %event.id, admin_id = admin.id, "Event authored");

    Ok(created(event, "event has been successfully created"))
}
