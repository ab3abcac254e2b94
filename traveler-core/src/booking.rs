use std::sync::Arc;
use tracing::{info, warn};
use traveler_shared::Masked;

use crate::models::{Booking, FlightId};
use crate::notify::Notifier;
use crate::policy::Caller;
use crate::repository::{BookingRepository, FlightRepository};
use crate::{CoreError, CoreResult};

pub const DUPLICATE_BOOKING: &str = "You have already booked this flight!";

/// Creates and lists bookings. One booking per (user, flight).
#[derive(Clone)]
pub struct BookingLedger {
    flights: Arc<dyn FlightRepository>,
    bookings: Arc<dyn BookingRepository>,
    notifier: Arc<dyn Notifier>,
}

impl BookingLedger {
    pub fn new(
        flights: Arc<dyn FlightRepository>,
        bookings: Arc<dyn BookingRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { flights, bookings, notifier }
    }

    pub async fn book(&self, caller: &Caller, flight_id: FlightId) -> CoreResult<Booking> {
        let flight = self
            .flights
            .get_flight(flight_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Flight {} not found", flight_id)))?;

        let booking = self
            .bookings
            .insert_booking(&flight, caller)
            .await?
            .ok_or_else(|| CoreError::Conflict(DUPLICATE_BOOKING.to_string()))?;

        info!(
            booking_id = booking.id,
            flight_id = flight.id,
            user = %caller.user_id,
            "Booking created"
        );

        // Confirmation email must never hold up or undo the booking.
        let notifier = self.notifier.clone();
        let confirmed = booking.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.booking_confirmed(&confirmed, &flight).await {
                warn!(
                    booking_id = confirmed.id,
                    recipient = %Masked(confirmed.user_email.as_str()),
                    "Failed to send booking confirmation: {}",
                    e
                );
            }
        });

        Ok(booking)
    }

    pub async fn list(&self, caller: &Caller) -> CoreResult<Vec<Booking>> {
        self.bookings.list_bookings(caller.booking_scope()).await
    }
}
