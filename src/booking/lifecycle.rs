//! Ride status transitions.
//!
//! pending -> accepted -> in_progress -> completed, and pending -> cancelled.
//! Each write is conditional on the stored status so a concurrent writer
//! cannot be silently overwritten.

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DatabaseConnection, NotSet, Set, TransactionTrait};
use uuid::Uuid;

use super::repository;
use super::{BookingError, Caller};
use crate::entities::ride::{self, RideStatus};
use crate::entities::user::UserRole;

async fn advance<C: ConnectionTrait>(
    conn: &C,
    ride: &ride::Model,
    from: RideStatus,
    to: RideStatus,
    driver_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<ride::Model, BookingError> {
    debug_assert!(from.can_transition_to(to));

    if ride.status != from {
        return Err(BookingError::StatusMismatch {
            expected: from,
            actual: ride.status,
        });
    }

    let changes = ride::ActiveModel {
        status: Set(to),
        driver_id: driver_id.map_or(NotSet, |id| Set(Some(id))),
        updated_at: Set(now.fixed_offset()),
        ..Default::default()
    };

    if !repository::update_if_status(conn, ride.id, from, changes).await? {
        tracing::warn!(
            ride_id = %ride.id,
            from = %from,
            to = %to,
            "Ride status changed concurrently"
        );
        return Err(BookingError::RideNoLongerAvailable);
    }

    repository::find_ride(conn, ride.id).await
}

/// Rider cancels their own pending ride.
pub async fn cancel(
    db: &DatabaseConnection,
    caller: &Caller,
    ride_id: Uuid,
    now: DateTime<Utc>,
) -> Result<ride::Model, BookingError> {
    caller.require(UserRole::Rider)?;

    let txn = db.begin().await?;
    let ride = repository::find_ride(&txn, ride_id).await?;
    if ride.rider_id != caller.user_id {
        return Err(BookingError::NotRideOwner);
    }

    let updated = advance(&txn, &ride, RideStatus::Pending, RideStatus::Cancelled, None, now).await?;
    txn.commit().await?;

    tracing::info!(ride_id = %ride_id, "Ride cancelled");
    Ok(updated)
}

/// Any driver claims a pending ride. Losing a race yields
/// [`BookingError::RideNoLongerAvailable`].
pub async fn accept(
    db: &DatabaseConnection,
    caller: &Caller,
    ride_id: Uuid,
    now: DateTime<Utc>,
) -> Result<ride::Model, BookingError> {
    caller.require(UserRole::Driver)?;

    let txn = db.begin().await?;
    let ride = repository::find_ride(&txn, ride_id).await?;
    if ride.status != RideStatus::Pending {
        return Err(BookingError::RideNoLongerAvailable);
    }

    let updated = advance(
        &txn,
        &ride,
        RideStatus::Pending,
        RideStatus::Accepted,
        Some(caller.user_id),
        now,
    )
    .await?;
    txn.commit().await?;

    tracing::info!(ride_id = %ride_id, driver_id = %caller.user_id, "Ride accepted");
    Ok(updated)
}

async fn driver_advance(
    db: &DatabaseConnection,
    caller: &Caller,
    ride_id: Uuid,
    from: RideStatus,
    to: RideStatus,
    now: DateTime<Utc>,
) -> Result<ride::Model, BookingError> {
    caller.require(UserRole::Driver)?;

    let txn = db.begin().await?;
    let ride = repository::find_ride(&txn, ride_id).await?;
    // An unassigned ride has not been accepted yet, so the status is what is wrong
    if ride.driver_id.is_none() && ride.status != from {
        return Err(BookingError::StatusMismatch {
            expected: from,
            actual: ride.status,
        });
    }
    if ride.driver_id != Some(caller.user_id) {
        return Err(BookingError::NotAssignedDriver);
    }

    let updated = advance(&txn, &ride, from, to, None, now).await?;
    txn.commit().await?;

    tracing::info!(ride_id = %ride_id, driver_id = %caller.user_id, status = %to, "Ride status updated");
    Ok(updated)
}

/// Assigned driver starts an accepted ride.
pub async fn start(
    db: &DatabaseConnection,
    caller: &Caller,
    ride_id: Uuid,
    now: DateTime<Utc>,
) -> Result<ride::Model, BookingError> {
    driver_advance(db, caller, ride_id, RideStatus::Accepted, RideStatus::InProgress, now).await
}

/// Assigned driver completes a ride in progress. Only completed rides count
/// toward monthly usage.
pub async fn complete(
    db: &DatabaseConnection,
    caller: &Caller,
    ride_id: Uuid,
    now: DateTime<Utc>,
) -> Result<ride::Model, BookingError> {
    driver_advance(db, caller, ride_id, RideStatus::InProgress, RideStatus::Completed, now).await
}
