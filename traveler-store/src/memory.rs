use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use traveler_core::report::ReportRow;
use traveler_core::repository::{BookingRepository, FlightRepository};
use traveler_core::search::FlightQuery;
use traveler_core::{
    Booking, BookingId, BookingScope, Caller, CoreError, CoreResult, Flight, FlightId, NewFlight, Page,
};
use traveler_shared::Masked;

/// In-process catalog and ledger for development and tests.
/// Every mutation happens under a single write guard, mirroring the database constraints.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    flights: BTreeMap<FlightId, Flight>,
    bookings: BTreeMap<BookingId, Booking>,
    next_flight_id: FlightId,
    next_booking_id: BookingId,
}

impl Inner {
    fn report_row(&self, booking: &Booking) -> Option<ReportRow> {
        let flight = self.flights.get(&booking.flight_id)?;
        Some(ReportRow {
            booking_id: booking.id,
            flight_id: flight.id,
            from_location: flight.from_location.clone(),
            to_location: flight.to_location.clone(),
            departure_time: flight.departure_time,
            user_email: Masked(booking.user_email.clone()),
            booked_at: booking.created_at,
        })
    }

    fn report_matches(
        &self,
        scope: BookingScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Iterator<Item = &Booking> + '_ {
        self.bookings.values().filter(move |b| {
            b.created_at >= from
                && b.created_at <= to
                && match scope {
                    BookingScope::Own(user_id) => b.user_id == user_id,
                    BookingScope::All => true,
                }
        })
    }

    fn insert_booking(
        &mut self,
        flight_id: FlightId,
        caller: &Caller,
        created_at: DateTime<Utc>,
    ) -> CoreResult<Option<Booking>> {
        if !self.flights.contains_key(&flight_id) {
            return Err(CoreError::NotFound("Flight not found".to_string()));
        }
        let duplicate = self
            .bookings
            .values()
            .any(|b| b.user_id == caller.user_id && b.flight_id == flight_id);
        if duplicate {
            return Ok(None);
        }

        self.next_booking_id += 1;
        let booking = Booking {
            id: self.next_booking_id,
            flight_id,
            user_id: caller.user_id,
            user_email: caller.email.clone(),
            created_at,
        };
        self.bookings.insert(booking.id, booking.clone());
        Ok(Some(booking))
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a booking with an explicit creation time. Used to seed history.
    pub async fn insert_booking_at(
        &self,
        flight_id: FlightId,
        caller: &Caller,
        created_at: DateTime<Utc>,
    ) -> CoreResult<Option<Booking>> {
        self.inner.write().await.insert_booking(flight_id, caller, created_at)
    }

    pub async fn booking_count(&self) -> usize {
        self.inner.read().await.bookings.len()
    }
}

#[async_trait]
impl FlightRepository for MemoryStore {
    async fn list_flights(&self, page: Page) -> CoreResult<(Vec<Flight>, u64)> {
        let inner = self.inner.read().await;
        let flights = inner
            .flights
            .values()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .cloned()
            .collect();
        Ok((flights, inner.flights.len() as u64))
    }

    async fn get_flight(&self, id: FlightId) -> CoreResult<Option<Flight>> {
        Ok(self.inner.read().await.flights.get(&id).cloned())
    }

    async fn create_flight(&self, flight: &NewFlight) -> CoreResult<Flight> {
        let mut inner = self.inner.write().await;
        inner.next_flight_id += 1;
        let flight = flight.clone().with_id(inner.next_flight_id);
        inner.flights.insert(flight.id, flight.clone());
        Ok(flight)
    }

    async fn update_flight(&self, id: FlightId, flight: &NewFlight) -> CoreResult<Option<Flight>> {
        let mut inner = self.inner.write().await;
        match inner.flights.get_mut(&id) {
            Some(existing) => {
                *existing = flight.clone().with_id(id);
                Ok(Some(existing.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_flight(&self, id: FlightId) -> CoreResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.flights.remove(&id).is_none() {
            return Ok(false);
        }
        inner.bookings.retain(|_, b| b.flight_id != id);
        Ok(true)
    }

    async fn search_flights(&self, query: &FlightQuery) -> CoreResult<Vec<Flight>> {
        let inner = self.inner.read().await;
        Ok(inner
            .flights
            .values()
            .filter(|f| query.matches(f))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn insert_booking(&self, flight: &Flight, caller: &Caller) -> CoreResult<Option<Booking>> {
        self.inner.write().await.insert_booking(flight.id, caller, Utc::now())
    }

    async fn list_bookings(&self, scope: BookingScope) -> CoreResult<Vec<Booking>> {
        let inner = self.inner.read().await;
        Ok(inner
            .bookings
            .values()
            .filter(|b| match scope {
                BookingScope::All => true,
                BookingScope::Own(user_id) => b.user_id == user_id,
            })
            .cloned()
            .collect())
    }

    async fn report_rows(
        &self,
        scope: BookingScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> CoreResult<Vec<ReportRow>> {
        let inner = self.inner.read().await;
        Ok(inner
            .report_matches(scope, from, to)
            .filter_map(|b| inner.report_row(b))
            .take(limit)
            .collect())
    }

    async fn report_booking_ids(
        &self,
        scope: BookingScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<BookingId>> {
        let inner = self.inner.read().await;
        Ok(inner.report_matches(scope, from, to).map(|b| b.id).collect())
    }

    async fn report_rows_by_ids(&self, ids: &[BookingId]) -> CoreResult<Vec<ReportRow>> {
        let inner = self.inner.read().await;
        Ok(inner
            .bookings
            .values()
            .filter(|b| ids.contains(&b.id))
            .filter_map(|b| inner.report_row(b))
            .collect())
    }

    async fn departing_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> CoreResult<Vec<ReportRow>> {
        let inner = self.inner.read().await;
        let mut rows: Vec<ReportRow> = inner
            .bookings
            .values()
            .filter_map(|b| inner.report_row(b))
            .filter(|r| r.departure_time > from && r.departure_time <= to)
            .collect();
        rows.sort_by_key(|r| (r.departure_time, r.booking_id));
        Ok(rows)
    }
}
