//! Contract eligibility and booking engine.
//!
//! Handlers build a [`Caller`] from the authenticated claims and call into
//! [`service`] (book, edit, availability) and [`lifecycle`] (status
//! transitions). Every state change runs in one database transaction.

pub mod eligibility;
pub mod error;
pub mod lifecycle;
pub mod repository;
pub mod service;
pub mod trip;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::user::UserRole;
use crate::entities::{passenger, ride, ride_stop};
use crate::utils::jwt::Claims;

pub use eligibility::{ContractStatus, Warning};
pub use error::BookingError;
pub use service::BookingOutcome;
pub use trip::TripRequest;

/// Authenticated identity performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Caller {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    pub fn require(&self, role: UserRole) -> Result<(), BookingError> {
        if self.role != role {
            return Err(BookingError::WrongRole { required: role });
        }
        Ok(())
    }
}

impl From<&Claims> for Caller {
    fn from(claims: &Claims) -> Self {
        Self::new(claims.sub, claims.role)
    }
}

/// A ride with its ordered stops and passengers.
#[derive(Debug, Clone, Serialize)]
pub struct RideAggregate {
    #[serde(flatten)]
    pub ride: ride::Model,
    pub stops: Vec<ride_stop::Model>,
    pub passengers: Vec<passenger::Model>,
}

/// Instants are stored in UTC so range filters compare like with like.
pub(crate) fn storage_instant(at: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    at.with_timezone(&Utc).fixed_offset()
}
