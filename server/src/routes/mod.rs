use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, Config, SecurityHeadersLayer};
use crate::handlers::{events, health_check, orders};
use crate::state::AppState;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    let customer_orders = Router::new()
        .route(
            "/orders",
            post(orders::place_order).get(orders::get_many_orders),
        )
        .route("/orders/on-expire", post(orders::on_expire_order))
        .route(
            "/orders/on-payment-notification",
            post(orders::on_payment_notification),
        );

    let admin_events = Router::new().route("/events", post(events::create_event));

    let request_tracing = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::x_request_id());

    Router::new()
        .route("/health", get(health_check))
        .nest("/tm-order/v1/customerapp", customer_orders)
        .nest("/tm-order/v1/adminapp", admin_events)
        .with_state(state)
        .layer(request_tracing)
        .layer(SecurityHeadersLayer::new(config.is_production))
        .layer(create_cors_layer(&config.cors_allowed_origins))
}
