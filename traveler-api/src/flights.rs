use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use traveler_core::policy::authorize;
use traveler_core::{Capability, Flight, FlightId, FlightPatch, NewFlight, Page};

use crate::error::AppError;
use crate::middleware::{CurrentCaller, MaybeCaller};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct FlightPage {
    pub count: u64,
    pub page: u32,
    pub results: Vec<Flight>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/flights", get(list_flights).post(create_flight))
        .route(
            "/flights/{id}",
            get(get_flight)
                .put(replace_flight)
                .patch(patch_flight)
                .delete(delete_flight),
        )
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_flights(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<FlightPage>, AppError> {
    authorize(caller.as_ref(), Capability::ReadFlights)?;
    let Query(params) = params?;

    let page = Page::new(params.page, params.page_size);
    let (results, count) = state.flights.list_flights(page).await?;

    Ok(Json(FlightPage {
        count,
        page: page.number,
        results,
    }))
}

async fn get_flight(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    id: Result<Path<FlightId>, PathRejection>,
) -> Result<Json<Flight>, AppError> {
    authorize(caller.as_ref(), Capability::ReadFlights)?;
    let Path(id) = id?;

    state
        .flights
        .get_flight(id)
        .await?
        .map(Json)
        .ok_or_else(|| flight_not_found(id))
}

async fn create_flight(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    payload: Result<Json<NewFlight>, JsonRejection>,
) -> Result<(StatusCode, Json<Flight>), AppError> {
    authorize(Some(&caller), Capability::WriteFlights)?;
    let Json(flight) = payload?;
    flight.validate()?;

    let created = state.flights.create_flight(&flight).await?;
    info!(flight_id = created.id, by = %caller.user_id, "Flight created");

    Ok((StatusCode::CREATED, Json(created)))
}

async fn replace_flight(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    id: Result<Path<FlightId>, PathRejection>,
    payload: Result<Json<NewFlight>, JsonRejection>,
) -> Result<Json<Flight>, AppError> {
    authorize(Some(&caller), Capability::WriteFlights)?;
    let Path(id) = id?;
    let Json(flight) = payload?;
    flight.validate()?;

    let updated = state
        .flights
        .update_flight(id, &flight)
        .await?
        .ok_or_else(|| flight_not_found(id))?;
    info!(flight_id = id, by = %caller.user_id, "Flight replaced");

    Ok(Json(updated))
}

async fn patch_flight(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    id: Result<Path<FlightId>, PathRejection>,
    payload: Result<Json<FlightPatch>, JsonRejection>,
) -> Result<Json<Flight>, AppError> {
    authorize(Some(&caller), Capability::WriteFlights)?;
    let Path(id) = id?;
    let Json(patch) = payload?;

    let current = state
        .flights
        .get_flight(id)
        .await?
        .ok_or_else(|| flight_not_found(id))?;
    let merged = patch.apply(current);
    merged.validate()?;

    let updated = state
        .flights
        .update_flight(id, &merged)
        .await?
        .ok_or_else(|| flight_not_found(id))?;
    info!(flight_id = id, by = %caller.user_id, "Flight updated");

    Ok(Json(updated))
}

async fn delete_flight(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    id: Result<Path<FlightId>, PathRejection>,
) -> Result<StatusCode, AppError> {
    authorize(Some(&caller), Capability::WriteFlights)?;
    let Path(id) = id?;

    if !state.flights.delete_flight(id).await? {
        return Err(flight_not_found(id));
    }
    info!(flight_id = id, by = %caller.user_id, "Flight deleted");

    Ok(StatusCode::NO_CONTENT)
}

fn flight_not_found(id: FlightId) -> AppError {
    AppError::NotFoundError(format!("Flight {} not found", id))
}
