use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Admin,
}

impl Role {
    /// Maps an identity-provider role claim. Anything that is not an admin role is an owner.
    pub fn from_claim(role: &str) -> Self {
        match role {
            "ADMIN" | "SUPER_ADMIN" => Role::Admin,
            _ => Role::Owner,
        }
    }

    pub fn allows(self, capability: Capability) -> bool {
        match self {
            Role::Admin => true,
            Role::Owner => matches!(
                capability,
                Capability::ReadFlights
                    | Capability::SearchFlights
                    | Capability::CreateBooking
                    | Capability::ReadOwnBookings
                    | Capability::GenerateReport
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ReadFlights,
    WriteFlights,
    SearchFlights,
    CreateBooking,
    ReadOwnBookings,
    ReadAllBookings,
    GenerateReport,
}

impl Capability {
    pub fn is_public(self) -> bool {
        matches!(self, Capability::ReadFlights | Capability::SearchFlights)
    }
}

/// The identity behind a request, resolved once and passed to handlers by value.
#[derive(Debug, Clone, PartialEq)]
pub struct Caller {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Which bookings a listing is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingScope {
    Own(Uuid),
    All,
}

impl Caller {
    pub fn booking_scope(&self) -> BookingScope {
        if self.role.allows(Capability::ReadAllBookings) {
            BookingScope::All
        } else {
            BookingScope::Own(self.user_id)
        }
    }
}

/// Checks a capability for a possibly anonymous caller.
pub fn authorize(caller: Option<&Caller>, capability: Capability) -> CoreResult<()> {
    if capability.is_public() {
        return Ok(());
    }
    match caller {
        None => Err(CoreError::Unauthorized),
        Some(c) if c.role.allows(capability) => Ok(()),
        Some(_) => Err(CoreError::Forbidden),
    }
}
