//! Booking, editing and availability checks.

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use super::eligibility::{self, ContractStatus, Selection, UsageSnapshot};
use super::repository;
use super::trip::{validate_trip, TripRequest, ValidatedTrip};
use super::{storage_instant, BookingError, Caller, RideAggregate};
use crate::entities::ride::RideStatus;
use crate::entities::user::UserRole;
use crate::entities::{car, contract, ride};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BookingOutcome {
    Booked(RideAggregate),
    /// Overtime needs an explicit acknowledgement; nothing was written.
    NeedsConfirmation { contract_id: Uuid, message: String },
}

#[derive(Debug)]
enum Resolution {
    Proceed {
        contract: contract::Model,
        overtime: bool,
    },
    NeedsConfirmation {
        contract_id: Uuid,
        message: String,
    },
}

async fn evaluate_contract<C: ConnectionTrait>(
    conn: &C,
    contract: &contract::Model,
    pickup: DateTime<FixedOffset>,
    requested_distance_km: Option<f64>,
    exclude_ride: Option<Uuid>,
) -> Result<ContractStatus, BookingError> {
    let usage = UsageSnapshot {
        monthly_usage_km: repository::monthly_usage_km(conn, contract.id, pickup).await?,
        has_conflicting_booking: repository::has_conflicting_booking(
            conn,
            contract.car_id,
            pickup,
            exclude_ride,
        )
        .await?,
    };

    Ok(eligibility::evaluate(
        contract,
        pickup,
        usage,
        requested_distance_km,
    ))
}

fn overtime_prompt(status: &ContractStatus) -> String {
    let reason = status
        .message
        .unwrap_or("Pickup is outside the contracted schedule");
    format!("{}. Resubmit with confirm_overtime to book anyway.", reason)
}

async fn resolve_contract<C: ConnectionTrait>(
    conn: &C,
    rider_id: Uuid,
    trip: &ValidatedTrip,
    exclude_ride: Option<Uuid>,
) -> Result<Resolution, BookingError> {
    match trip.contract_id {
        Some(contract_id) => resolve_explicit(conn, rider_id, contract_id, trip, exclude_ride).await,
        None => resolve_automatic(conn, rider_id, trip, exclude_ride).await,
    }
}

async fn resolve_explicit<C: ConnectionTrait>(
    conn: &C,
    rider_id: Uuid,
    contract_id: Uuid,
    trip: &ValidatedTrip,
    exclude_ride: Option<Uuid>,
) -> Result<Resolution, BookingError> {
    let contract = contract::Entity::find_by_id(contract_id)
        .one(conn)
        .await?
        .filter(|c| c.user_id == rider_id)
        .ok_or_else(|| {
            BookingError::InvalidContract("Contract not found for this rider".to_string())
        })?;

    if !contract.covers_date(trip.pickup_at.date_naive()) {
        return Err(BookingError::InvalidContract(
            "Contract is not active on the pickup date".to_string(),
        ));
    }

    let car_active = car::Entity::find_by_id(contract.car_id)
        .one(conn)
        .await?
        .is_some_and(|c| c.is_active);
    if !car_active {
        return Err(BookingError::InvalidContract(
            "The contract's car is out of service".to_string(),
        ));
    }

    let status = evaluate_contract(
        conn,
        &contract,
        trip.pickup_at,
        Some(trip.distance_km),
        exclude_ride,
    )
    .await?;

    if status.has_conflicting_booking {
        return Err(BookingError::CarUnavailable(
            "The car already has a booking around this time".to_string(),
        ));
    }

    if status.over_budget {
        return Err(BookingError::MonthlyLimitExceeded {
            limit_km: status.monthly_km_limit,
            used_km: status.monthly_usage_km,
            requested_km: trip.distance_km,
        });
    }

    if status.overtime && !trip.confirm_overtime {
        return Ok(Resolution::NeedsConfirmation {
            contract_id: contract.id,
            message: overtime_prompt(&status),
        });
    }

    Ok(Resolution::Proceed {
        overtime: status.overtime,
        contract,
    })
}

async fn resolve_automatic<C: ConnectionTrait>(
    conn: &C,
    rider_id: Uuid,
    trip: &ValidatedTrip,
    exclude_ride: Option<Uuid>,
) -> Result<Resolution, BookingError> {
    let contracts = repository::usable_contracts(conn, rider_id, trip.pickup_at).await?;
    if contracts.is_empty() {
        return Err(BookingError::NoAvailableContract(
            "You have no active contract covering the pickup date".to_string(),
        ));
    }

    let mut statuses = Vec::with_capacity(contracts.len());
    for contract in &contracts {
        statuses.push(
            evaluate_contract(
                conn,
                contract,
                trip.pickup_at,
                Some(trip.distance_km),
                exclude_ride,
            )
            .await?,
        );
    }

    let (chosen, overtime) = match eligibility::select_contract(&statuses) {
        Selection::Regular(status) => (status, false),
        Selection::Overtime(status) => (status, true),
        Selection::Unavailable => {
            // Report the reason of the first contract, in list order
            let reason = statuses
                .first()
                .and_then(|s| s.message)
                .unwrap_or("No contract can take this booking");
            return Err(BookingError::NoAvailableContract(reason.to_string()));
        }
    };

    if overtime && !trip.confirm_overtime {
        return Ok(Resolution::NeedsConfirmation {
            contract_id: chosen.contract_id,
            message: overtime_prompt(chosen),
        });
    }

    let contract = contracts
        .into_iter()
        .find(|c| c.id == chosen.contract_id)
        .ok_or_else(|| BookingError::NoAvailableContract("Selected contract vanished".to_string()))?;

    Ok(Resolution::Proceed { contract, overtime })
}

/// Evaluate every usable contract of the rider for a prospective pickup.
pub async fn contract_statuses<C: ConnectionTrait>(
    conn: &C,
    caller: &Caller,
    pickup: DateTime<FixedOffset>,
    requested_distance_km: Option<f64>,
    exclude_ride: Option<Uuid>,
) -> Result<Vec<ContractStatus>, BookingError> {
    caller.require(UserRole::Rider)?;

    let contracts = repository::usable_contracts(conn, caller.user_id, pickup).await?;
    let mut statuses = Vec::with_capacity(contracts.len());
    for contract in &contracts {
        statuses.push(
            evaluate_contract(conn, contract, pickup, requested_distance_km, exclude_ride).await?,
        );
    }

    Ok(statuses)
}

/// Book a ride for the calling rider.
///
/// Validation happens before the transaction opens; the ride, its stops and
/// passengers are then written as one unit.
pub async fn book(
    db: &DatabaseConnection,
    caller: &Caller,
    request: TripRequest,
    now: DateTime<Utc>,
) -> Result<BookingOutcome, BookingError> {
    caller.require(UserRole::Rider)?;
    let trip = validate_trip(request, now)?;

    let txn = db.begin().await?;

    let (contract, overtime) = match resolve_contract(&txn, caller.user_id, &trip, None).await? {
        Resolution::Proceed { contract, overtime } => (contract, overtime),
        Resolution::NeedsConfirmation {
            contract_id,
            message,
        } => {
            txn.rollback().await?;
            return Ok(BookingOutcome::NeedsConfirmation {
                contract_id,
                message,
            });
        }
    };

    let timestamp = now.fixed_offset();
    let pickup = trip.pickup();
    let dropoff = trip.dropoff();

    let ride = ride::ActiveModel {
        id: Set(Uuid::new_v4()),
        rider_id: Set(caller.user_id),
        driver_id: Set(None),
        car_id: Set(Some(contract.car_id)),
        contract_id: Set(Some(contract.id)),
        pickup_lat: Set(pickup.lat),
        pickup_lng: Set(pickup.lng),
        dropoff_lat: Set(dropoff.lat),
        dropoff_lng: Set(dropoff.lng),
        pickup_address: Set(pickup.address.clone()),
        dropoff_address: Set(dropoff.address.clone()),
        pickup_datetime: Set(storage_instant(trip.pickup_at)),
        distance: Set(trip.distance_km),
        fare: Set(trip.fare),
        route_data: Set(trip.route_data.clone()),
        estimated_duration_hours: Set(trip.estimated_duration_hours),
        is_overtime: Set(overtime),
        status: Set(RideStatus::Pending),
        created_at: Set(timestamp),
        updated_at: Set(timestamp),
    };

    let ride = ride.insert(&txn).await?;
    let (stops, passengers) =
        repository::insert_children(&txn, ride.id, &trip.stops, &trip.passengers).await?;

    txn.commit().await?;

    tracing::info!(
        ride_id = %ride.id,
        rider_id = %caller.user_id,
        contract_id = %contract.id,
        overtime,
        fare = ride.fare,
        "Ride booked"
    );

    Ok(BookingOutcome::Booked(RideAggregate {
        ride,
        stops,
        passengers,
    }))
}

/// Replace the trip details of a pending ride owned by the caller.
pub async fn edit(
    db: &DatabaseConnection,
    caller: &Caller,
    ride_id: Uuid,
    request: TripRequest,
    now: DateTime<Utc>,
) -> Result<BookingOutcome, BookingError> {
    caller.require(UserRole::Rider)?;

    let txn = db.begin().await?;

    let existing = repository::find_ride(&txn, ride_id).await?;
    if existing.rider_id != caller.user_id {
        return Err(BookingError::NotRideOwner);
    }
    if existing.status != RideStatus::Pending {
        return Err(BookingError::StatusMismatch {
            expected: RideStatus::Pending,
            actual: existing.status,
        });
    }

    let trip = validate_trip(request, now)?;

    let (contract, overtime) =
        match resolve_contract(&txn, caller.user_id, &trip, Some(ride_id)).await? {
            Resolution::Proceed { contract, overtime } => (contract, overtime),
            Resolution::NeedsConfirmation {
                contract_id,
                message,
            } => {
                txn.rollback().await?;
                return Ok(BookingOutcome::NeedsConfirmation {
                    contract_id,
                    message,
                });
            }
        };

    let pickup = trip.pickup();
    let dropoff = trip.dropoff();
    let changes = ride::ActiveModel {
        car_id: Set(Some(contract.car_id)),
        contract_id: Set(Some(contract.id)),
        pickup_lat: Set(pickup.lat),
        pickup_lng: Set(pickup.lng),
        dropoff_lat: Set(dropoff.lat),
        dropoff_lng: Set(dropoff.lng),
        pickup_address: Set(pickup.address.clone()),
        dropoff_address: Set(dropoff.address.clone()),
        pickup_datetime: Set(storage_instant(trip.pickup_at)),
        distance: Set(trip.distance_km),
        fare: Set(trip.fare),
        route_data: Set(trip.route_data.clone()),
        estimated_duration_hours: Set(trip.estimated_duration_hours),
        is_overtime: Set(overtime),
        updated_at: Set(now.fixed_offset()),
        ..Default::default()
    };

    if !repository::update_if_status(&txn, ride_id, RideStatus::Pending, changes).await? {
        tracing::warn!(ride_id = %ride_id, "Ride left pending while being edited");
        return Err(BookingError::RideNoLongerAvailable);
    }

    repository::replace_children(&txn, ride_id, &trip.stops, &trip.passengers).await?;
    let ride = repository::find_ride(&txn, ride_id).await?;
    let aggregate = repository::load_aggregate(&txn, ride).await?;

    txn.commit().await?;

    tracing::info!(
        ride_id = %ride_id,
        contract_id = %contract.id,
        overtime,
        "Ride updated"
    );

    Ok(BookingOutcome::Booked(aggregate))
}
