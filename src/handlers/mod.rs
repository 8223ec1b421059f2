pub mod events;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;

use crate::state::AppState;
use crate::utils::response::{error, ok};

pub use events::{aggregate, create_event, delete_event, get_event, submit_availability};

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
    database: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> Response {
    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => ok(HealthPayload {
            status: "ok",
            service: "meetingfinder-api",
            database: "healthy",
        }),
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            error(
                "DATABASE_UNAVAILABLE",
                "Database is not reachable",
                None,
                StatusCode::SERVICE_UNAVAILABLE,
            )
        }
    }
}
