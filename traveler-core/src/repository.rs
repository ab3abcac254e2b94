use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Booking, BookingId, Flight, FlightId, NewFlight, Page};
use crate::policy::{BookingScope, Caller};
use crate::report::ReportRow;
use crate::search::FlightQuery;
use crate::CoreResult;

/// Repository trait for the flight catalog
#[async_trait]
pub trait FlightRepository: Send + Sync {
    /// One page of flights in id order, plus the total count.
    async fn list_flights(&self, page: Page) -> CoreResult<(Vec<Flight>, u64)>;

    async fn get_flight(&self, id: FlightId) -> CoreResult<Option<Flight>>;

    async fn create_flight(&self, flight: &NewFlight) -> CoreResult<Flight>;

    /// Full replace. `None` when the flight does not exist.
    async fn update_flight(&self, id: FlightId, flight: &NewFlight) -> CoreResult<Option<Flight>>;

    /// Removes the flight and its bookings. `false` when nothing was deleted.
    async fn delete_flight(&self, id: FlightId) -> CoreResult<bool>;

    async fn search_flights(&self, query: &FlightQuery) -> CoreResult<Vec<Flight>>;
}

/// Repository trait for the booking ledger
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Atomic check-and-insert on (user, flight).
    ///
    /// Returns `Ok(None)` when the caller already holds a booking for this flight;
    /// concurrent calls for the same pair see exactly one `Some`.
    async fn insert_booking(&self, flight: &Flight, caller: &Caller) -> CoreResult<Option<Booking>>;

    async fn list_bookings(&self, scope: BookingScope) -> CoreResult<Vec<Booking>>;

    /// Bookings in `scope` created within `[from, to]`, joined with their flights.
    /// Ordered by booking id and capped at `limit` rows.
    async fn report_rows(
        &self,
        scope: BookingScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> CoreResult<Vec<ReportRow>>;

    /// Ids of every booking `report_rows` would match, without the join or a cap.
    async fn report_booking_ids(
        &self,
        scope: BookingScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<BookingId>>;

    async fn report_rows_by_ids(&self, ids: &[BookingId]) -> CoreResult<Vec<ReportRow>>;

    /// Bookings whose flight departs within `(from, to]`.
    async fn departing_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> CoreResult<Vec<ReportRow>>;
}
