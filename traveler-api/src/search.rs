use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use traveler_core::policy::authorize;
use traveler_core::search::{self, SearchRequest};
use traveler_core::{Capability, Flight};

use crate::error::AppError;
use crate::middleware::MaybeCaller;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/search", post(search_flights))
}

async fn search_flights(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<Vec<Flight>>, AppError> {
    authorize(caller.as_ref(), Capability::SearchFlights)?;
    let Json(req) = payload?;

    let flights = search::search_flights(state.flights.as_ref(), req).await?;
    Ok(Json(flights))
}
