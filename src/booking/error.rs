use sea_orm::DbErr;
use thiserror::Error;

use crate::entities::ride::RideStatus;
use crate::entities::user::UserRole;

/// Failures of the booking engine. Each variant is a distinct, reportable kind.
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Only a {required:?} may perform this action")]
    WrongRole { required: UserRole },

    #[error("You can only manage your own rides")]
    NotRideOwner,

    #[error("You are not the driver assigned to this ride")]
    NotAssignedDriver,

    #[error("Ride not found")]
    RideNotFound,

    #[error("Ride is {actual}, expected {expected}")]
    StatusMismatch {
        expected: RideStatus,
        actual: RideStatus,
    },

    #[error("Invalid contract: {0}")]
    InvalidContract(String),

    #[error("No available contract: {0}")]
    NoAvailableContract(String),

    #[error("Car unavailable: {0}")]
    CarUnavailable(String),

    #[error("Monthly limit of {limit_km} km exceeded ({used_km} km used, {requested_km} km requested)")]
    MonthlyLimitExceeded {
        limit_km: f64,
        used_km: f64,
        requested_km: f64,
    },

    #[error("Ride is no longer available")]
    RideNoLongerAvailable,

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl BookingError {
    /// Stable machine readable code for clients and logs.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "validation_error",
            BookingError::WrongRole { .. } => "wrong_role",
            BookingError::NotRideOwner => "not_ride_owner",
            BookingError::NotAssignedDriver => "not_assigned_driver",
            BookingError::RideNotFound => "ride_not_found",
            BookingError::StatusMismatch { .. } => "status_mismatch",
            BookingError::InvalidContract(_) => "invalid_contract",
            BookingError::NoAvailableContract(_) => "no_available_contract",
            BookingError::CarUnavailable(_) => "car_unavailable",
            BookingError::MonthlyLimitExceeded { .. } => "monthly_limit_exceeded",
            BookingError::RideNoLongerAvailable => "ride_no_longer_available",
            BookingError::Database(_) => "database_error",
        }
    }

    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            BookingError::WrongRole { .. }
                | BookingError::NotRideOwner
                | BookingError::NotAssignedDriver
        )
    }
}
