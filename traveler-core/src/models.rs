use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CoreError, CoreResult};

pub type FlightId = i64;
pub type BookingId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flight {
    pub id: FlightId,
    pub from_location: String,
    pub to_location: String,
    pub departure_time: DateTime<Utc>,
    pub capacity: i32,
}

/// Body of a flight create or full update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewFlight {
    pub from_location: String,
    pub to_location: String,
    pub departure_time: DateTime<Utc>,
    pub capacity: i32,
}

impl NewFlight {
    pub fn validate(&self) -> CoreResult<()> {
        if self.from_location.trim().is_empty() {
            return Err(CoreError::Validation("from_location may not be blank".to_string()));
        }
        if self.to_location.trim().is_empty() {
            return Err(CoreError::Validation("to_location may not be blank".to_string()));
        }
        if self.capacity < 0 {
            return Err(CoreError::Validation("capacity must be zero or greater".to_string()));
        }
        Ok(())
    }

    pub fn with_id(self, id: FlightId) -> Flight {
        Flight {
            id,
            from_location: self.from_location,
            to_location: self.to_location,
            departure_time: self.departure_time,
            capacity: self.capacity,
        }
    }
}

impl From<Flight> for NewFlight {
    fn from(flight: Flight) -> Self {
        Self {
            from_location: flight.from_location,
            to_location: flight.to_location,
            departure_time: flight.departure_time,
            capacity: flight.capacity,
        }
    }
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlightPatch {
    pub from_location: Option<String>,
    pub to_location: Option<String>,
    pub departure_time: Option<DateTime<Utc>>,
    pub capacity: Option<i32>,
}

impl FlightPatch {
    pub fn apply(self, current: Flight) -> NewFlight {
        NewFlight {
            from_location: self.from_location.unwrap_or(current.from_location),
            to_location: self.to_location.unwrap_or(current.to_location),
            departure_time: self.departure_time.unwrap_or(current.departure_time),
            capacity: self.capacity.unwrap_or(current.capacity),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: BookingId,
    pub flight_id: FlightId,
    pub user_id: Uuid,
    pub user_email: String,
    pub created_at: DateTime<Utc>,
}

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// 1-based page request for catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn new(number: Option<u32>, size: Option<u32>) -> Self {
        Self {
            number: number.unwrap_or(1).max(1),
            size: size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn lagos_to_nairobi() -> NewFlight {
        NewFlight {
            from_location: "Lagos".to_string(),
            to_location: "Nairobi".to_string(),
            departure_time: Utc.with_ymd_and_hms(2019, 6, 22, 10, 0, 0).unwrap(),
            capacity: 120,
        }
    }

    #[test]
    fn test_new_flight_validation() {
        assert!(lagos_to_nairobi().validate().is_ok());

        let mut blank = lagos_to_nairobi();
        blank.to_location = "  ".to_string();
        assert!(matches!(blank.validate(), Err(CoreError::Validation(_))));

        let mut negative = lagos_to_nairobi();
        negative.capacity = -1;
        assert!(matches!(negative.validate(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_patch_keeps_untouched_fields() {
        let flight = lagos_to_nairobi().with_id(7);
        let patch = FlightPatch { capacity: Some(90), ..Default::default() };

        let updated = patch.apply(flight.clone());
        assert_eq!(updated.capacity, 90);
        assert_eq!(updated.from_location, flight.from_location);
        assert_eq!(updated.departure_time, flight.departure_time);
    }

    #[test]
    fn test_page_defaults_and_bounds() {
        let page = Page::default();
        assert_eq!((page.number, page.size), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(page.offset(), 0);

        let page = Page::new(Some(3), Some(500));
        assert_eq!(page.size, MAX_PAGE_SIZE);
        assert_eq!(page.offset(), 200);

        let page = Page::new(Some(0), Some(0));
        assert_eq!((page.number, page.size), (1, 1));
    }
}
