use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;

use crate::dto::order::{ExpireOrderEvent, PaymentNotificationEvent, PlaceOrderRequest};
use crate::dto::page::{PageParams, PageRequest};
use crate::handlers::session::CustomerSession;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::response::{created, empty_success, paginated};

pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::UnprocessableEntity(rejection.body_text()))
}

pub async fn place_order(
    State(state): State<AppState>,
    CustomerSession(account): CustomerSession,
    payload: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> AppResult<Response> {
    let request = json_body(payload)?;
    let order = state.orders.place_order(&account, request).await?;

    Ok(created(order, "order has been successfully placed"))
}

pub async fn get_many_orders(
    State(state): State<AppState>,
    CustomerSession(account): CustomerSession,
    Query(params): Query<PageParams>,
) -> AppResult<Response> {
    let page = PageRequest::try_from(params)?;
    let (orders, meta) = state.orders.get_many_orders(&account, page).await?;

    Ok(paginated(orders, meta, "list of orders"))
}

pub async fn on_expire_order(
    State(state): State<AppState>,
    payload: Result<Json<ExpireOrderEvent>, JsonRejection>,
) -> AppResult<Response> {
    let event = json_body(payload)?;
    state.orders.on_expire_order(event).await?;

    Ok(empty_success("order has been successfully expired"))
}

pub async fn on_payment_notification(
    State(state): State<AppState>,
    payload: Result<Json<PaymentNotificationEvent>, JsonRejection>,
) -> AppResult<Response> {
    let event = json_body(payload)?;
    state.orders.on_payment_notification(event).await?;

    Ok(empty_success(
        "order has been update by payment notification",
    ))
}
