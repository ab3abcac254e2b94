use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use traveler_core::policy::authorize;
use traveler_core::{Booking, Capability, FlightId};

use crate::error::AppError;
use crate::middleware::CurrentCaller;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    #[serde(default)]
    pub flight: Value,
}

#[derive(Debug, Serialize)]
pub struct BookingList {
    pub booked_flight: Vec<Booking>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/bookings", get(list_bookings).post(create_booking))
}

async fn list_bookings(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
) -> Result<Json<BookingList>, AppError> {
    authorize(Some(&caller), Capability::ReadOwnBookings)?;
    let booked_flight = state.ledger().list(&caller).await?;

    Ok(Json(BookingList { booked_flight }))
}

async fn create_booking(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    authorize(Some(&caller), Capability::CreateBooking)?;
    let Json(req) = payload?;

    let flight_id = parse_flight_id(&req.flight)
        .ok_or_else(|| AppError::NotFoundError("Flight not found".to_string()))?;
    let booking = state.ledger().book(&caller, flight_id).await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

/// Form posts send the id as a string, JSON clients as a number.
fn parse_flight_id(value: &Value) -> Option<FlightId> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
