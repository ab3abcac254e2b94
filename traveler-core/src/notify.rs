use async_trait::async_trait;

use crate::models::{Booking, Flight};
use crate::report::{ReportRow, ReportWindow};
use crate::CoreResult;

/// Outbound email gateway. Callers treat every send as best-effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn booking_confirmed(&self, booking: &Booking, flight: &Flight) -> CoreResult<()>;

    async fn report_ready(
        &self,
        recipient: &str,
        window: &ReportWindow,
        rows: &[ReportRow],
    ) -> CoreResult<()>;

    async fn departure_reminder(&self, row: &ReportRow) -> CoreResult<()>;
}

pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

pub fn booking_confirmation(booking: &Booking, flight: &Flight) -> EmailContent {
    EmailContent {
        subject: format!("Booking confirmed: {} to {}", flight.from_location, flight.to_location),
        body: format!(
            "Your booking #{} is confirmed.\n\nFrom: {}\nTo: {}\nDeparture: {}\n\nThank you for flying with us.",
            booking.id,
            flight.from_location,
            flight.to_location,
            flight.departure_time.format("%Y-%m-%d %H:%M UTC"),
        ),
    }
}

pub fn report_ready(window: &ReportWindow, rows: &[ReportRow]) -> EmailContent {
    EmailContent {
        subject: format!("Booking report {} to {}", window.start, window.end),
        body: format!(
            "Your booking report is ready. {} bookings were made between {} and {}.\n\n{}",
            rows.len(),
            window.start,
            window.end,
            crate::report::render_csv(rows),
        ),
    }
}

pub fn departure_reminder(row: &ReportRow) -> EmailContent {
    EmailContent {
        subject: format!("Reminder: your flight to {} departs soon", row.to_location),
        body: format!(
            "This is a reminder for booking #{}.\n\nFrom: {}\nTo: {}\nDeparture: {}",
            row.booking_id,
            row.from_location,
            row.to_location,
            row.departure_time.format("%Y-%m-%d %H:%M UTC"),
        ),
    }
}
