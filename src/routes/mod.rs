use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, with_security_headers, Config};
use crate::handlers::{
    aggregate, create_event, delete_event, get_event, health_check, submit_availability,
};
use crate::state::AppState;
use crate::websocket::ws_handler;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .route("/events", post(create_event))
        .route("/events/:id", get(get_event).delete(delete_event))
        .route("/events/:id/availability", post(submit_availability))
        .route("/events/:id/aggregate", get(aggregate));

    let router = Router::new()
        .nest("/api", api)
        // Browser clients open the live channel on the bare origin.
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http());

    with_security_headers(router, config.production)
        .layer(create_cors_layer(&config.cors_allowed_origins))
        .with_state(state)
}
