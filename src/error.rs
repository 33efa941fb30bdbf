use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;

use crate::booking::BookingError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error(transparent)]
    Booking(#[from] BookingError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::Internal(_) | AppError::Database(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
            AppError::Booking(err) => (booking_status(err), err.code()),
        }
    }
}

fn booking_status(err: &BookingError) -> StatusCode {
    match err {
        BookingError::Validation(_) | BookingError::InvalidContract(_) => StatusCode::BAD_REQUEST,
        BookingError::WrongRole { .. }
        | BookingError::NotRideOwner
        | BookingError::NotAssignedDriver => StatusCode::FORBIDDEN,
        BookingError::RideNotFound => StatusCode::NOT_FOUND,
        BookingError::StatusMismatch { .. }
        | BookingError::NoAvailableContract(_)
        | BookingError::CarUnavailable(_)
        | BookingError::MonthlyLimitExceeded { .. }
        | BookingError::RideNoLongerAvailable => StatusCode::CONFLICT,
        BookingError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else if let AppError::Booking(err) = &self {
            if err.is_authorization() {
                tracing::warn!(code, "Booking operation refused");
            }
        }

        // Never leak database details to clients
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ride::RideStatus;

    #[test]
    fn test_booking_errors_map_to_distinct_statuses() {
        let cases = [
            (AppError::from(BookingError::Validation("bad".into())), StatusCode::BAD_REQUEST),
            (AppError::from(BookingError::NotRideOwner), StatusCode::FORBIDDEN),
            (AppError::from(BookingError::RideNotFound), StatusCode::NOT_FOUND),
            (
                AppError::from(BookingError::StatusMismatch {
                    expected: RideStatus::Pending,
                    actual: RideStatus::Accepted,
                }),
                StatusCode::CONFLICT,
            ),
            (AppError::from(BookingError::RideNoLongerAvailable), StatusCode::CONFLICT),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_codes_distinguish_authorization_failures() {
        let owner = AppError::from(BookingError::NotRideOwner);
        let driver = AppError::from(BookingError::NotAssignedDriver);
        assert_ne!(owner.status_and_code().1, driver.status_and_code().1);
    }
}
