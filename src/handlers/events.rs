use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use chrono::Utc;

use crate::models::{CreateEventRequest, EventDetails, SubmitAvailabilityRequest};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::response::{created, ok, status};

pub async fn create_event(
    State(state): State<AppState>,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(request) = payload?;
    let created_event = state.events.create(request, Utc::now()).await?;
    Ok(created(created_event))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let event = state.events.get(&id, Utc::now()).await?;
    let slots = state.availability.list_raw(&event.id).await?;
    Ok(ok(EventDetails { event, slots }))
}

pub async fn submit_availability(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<SubmitAvailabilityRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(request) = payload?;
    state.availability.submit(&id, request, Utc::now()).await?;
    Ok(status(StatusCode::CREATED, "saved"))
}

pub async fn aggregate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let summaries = state.aggregation.aggregate(&id, Utc::now()).await?;
    Ok(ok(summaries))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    if !state.events.delete(&id).await? {
        return Err(AppError::not_found(format!("event '{}' not found", id)));
    }
    Ok(status(StatusCode::OK, "deleted"))
}
