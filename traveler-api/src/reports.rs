use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use traveler_core::policy::authorize;
use traveler_core::report::{ReportOutcome, ReportRequest, PROCESSING_MESSAGE};
use traveler_core::Capability;

use crate::error::AppError;
use crate::middleware::CurrentCaller;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/report", get(booking_report))
}

/// Small reports come back inline; larger ones are mailed to the requester.
async fn booking_report(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    params: Result<Query<ReportRequest>, QueryRejection>,
) -> Result<Response, AppError> {
    authorize(Some(&caller), Capability::GenerateReport)?;
    let Query(request) = params?;

    let response = match state.report_dispatcher().dispatch(&caller, request).await? {
        ReportOutcome::Ready(rows) => Json(rows).into_response(),
        ReportOutcome::Deferred { job_id, .. } => Json(json!({
            "message": PROCESSING_MESSAGE,
            "job_id": job_id,
        }))
        .into_response(),
    };

    Ok(response)
}
