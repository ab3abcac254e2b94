use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;

use crate::models::Flight;
use crate::repository::FlightRepository;
use crate::{CoreError, CoreResult};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Days before the requested date still offered as alternatives.
pub const DAYS_BEFORE: i64 = 2;
/// Days after the requested date still offered as alternatives.
pub const DAYS_AFTER: i64 = 3;

const MISSING_FIELDS: &str =
    "All data fields are required! - from_location, departure_time, to_location";
const INVALID_DATE: &str = "Date-Time format is invalid: Format Y-m-d";

#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    pub from_location: Option<String>,
    pub to_location: Option<String>,
    pub departure_time: Option<String>,
}

/// A validated search: route fragments plus the inclusive departure window.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightQuery {
    pub from_location: String,
    pub to_location: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

impl SearchRequest {
    pub fn validate(self) -> CoreResult<FlightQuery> {
        let (from_location, to_location, departure_time) = match (
            non_empty(self.from_location),
            non_empty(self.to_location),
            non_empty(self.departure_time),
        ) {
            (Some(from), Some(to), Some(date)) => (from, to, date),
            _ => return Err(CoreError::Validation(MISSING_FIELDS.to_string())),
        };

        let date = NaiveDate::parse_from_str(&departure_time, DATE_FORMAT)
            .map_err(|_| CoreError::Validation(INVALID_DATE.to_string()))?;
        let (window_start, window_end) = departure_window(date);

        Ok(FlightQuery {
            from_location,
            to_location,
            window_start,
            window_end,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// `[date - 2d, date + 3d]`, both ends at midnight UTC.
pub fn departure_window(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let midnight = date.and_time(chrono::NaiveTime::MIN).and_utc();
    (
        midnight - Duration::days(DAYS_BEFORE),
        midnight + Duration::days(DAYS_AFTER),
    )
}

impl FlightQuery {
    pub fn matches(&self, flight: &Flight) -> bool {
        contains_ignore_case(&flight.from_location, &self.from_location)
            && contains_ignore_case(&flight.to_location, &self.to_location)
            && flight.departure_time >= self.window_start
            && flight.departure_time <= self.window_end
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Validates the request before touching the catalog.
pub async fn search_flights(
    repo: &dyn FlightRepository,
    request: SearchRequest,
) -> CoreResult<Vec<Flight>> {
    let query = request.validate()?;
    tracing::debug!(
        from = %query.from_location,
        to = %query.to_location,
        window_start = %query.window_start,
        window_end = %query.window_end,
        "Searching flights"
    );
    repo.search_flights(&query).await
}
