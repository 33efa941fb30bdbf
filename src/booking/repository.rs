//! Storage queries used by the engine. All take any connection so they run
//! inside the caller's transaction.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::eligibility::{booking_window, month_bounds};
use super::trip::{PlannedStop, ValidatedPassenger};
use super::{storage_instant, BookingError, RideAggregate};
use crate::entities::ride::RideStatus;
use crate::entities::{car, contract, passenger, ride, ride_stop};

/// A rider's contracts in a stable list order (oldest first).
pub async fn contracts_for_rider<C: ConnectionTrait>(
    conn: &C,
    rider_id: Uuid,
) -> Result<Vec<contract::Model>, DbErr> {
    contract::Entity::find()
        .filter(contract::Column::UserId.eq(rider_id))
        .order_by_asc(contract::Column::CreatedAt)
        .order_by_asc(contract::Column::Id)
        .all(conn)
        .await
}

/// Contracts whose period covers the pickup date and whose car is in service.
pub async fn usable_contracts<C: ConnectionTrait>(
    conn: &C,
    rider_id: Uuid,
    pickup: DateTime<FixedOffset>,
) -> Result<Vec<contract::Model>, DbErr> {
    let contracts = contracts_for_rider(conn, rider_id).await?;
    if contracts.is_empty() {
        return Ok(contracts);
    }

    let active_cars: HashSet<Uuid> = car::Entity::find()
        .filter(car::Column::Id.is_in(contracts.iter().map(|c| c.car_id)))
        .filter(car::Column::IsActive.eq(true))
        .all(conn)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();

    let date = pickup.date_naive();
    Ok(contracts
        .into_iter()
        .filter(|c| c.covers_date(date) && active_cars.contains(&c.car_id))
        .collect())
}

/// Rides booked against a contract, newest first.
pub async fn rides_for_contract<C: ConnectionTrait>(
    conn: &C,
    contract_id: Uuid,
) -> Result<Vec<ride::Model>, DbErr> {
    ride::Entity::find()
        .filter(ride::Column::ContractId.eq(contract_id))
        .order_by_desc(ride::Column::CreatedAt)
        .all(conn)
        .await
}

/// Sum of distance over completed rides on the contract created in the
/// calendar month that contains `at`.
pub async fn monthly_usage_km<C: ConnectionTrait>(
    conn: &C,
    contract_id: Uuid,
    at: DateTime<FixedOffset>,
) -> Result<f64, BookingError> {
    let (start, end) = month_bounds(at).ok_or_else(|| {
        BookingError::Validation(format!("Cannot determine the month of {}", at))
    })?;

    let usage = ride::Entity::find()
        .filter(ride::Column::ContractId.eq(contract_id))
        .filter(ride::Column::Status.eq(RideStatus::Completed))
        .filter(ride::Column::CreatedAt.gte(storage_instant(start)))
        .filter(ride::Column::CreatedAt.lt(storage_instant(end)))
        .all(conn)
        .await?
        .iter()
        .fold(0.0, |total, r| total + r.distance);

    Ok(usage)
}

/// Whether the car holds an active booking whose 2 hour window overlaps the
/// window starting at `pickup`.
pub async fn has_conflicting_booking<C: ConnectionTrait>(
    conn: &C,
    car_id: Uuid,
    pickup: DateTime<FixedOffset>,
    exclude_ride: Option<Uuid>,
) -> Result<bool, DbErr> {
    let pickup = storage_instant(pickup);
    let window = booking_window();

    let mut query = ride::Entity::find()
        .filter(ride::Column::CarId.eq(car_id))
        .filter(ride::Column::Status.is_in(RideStatus::ACTIVE))
        .filter(ride::Column::PickupDatetime.gt(pickup - window))
        .filter(ride::Column::PickupDatetime.lt(pickup + window));

    if let Some(ride_id) = exclude_ride {
        query = query.filter(ride::Column::Id.ne(ride_id));
    }

    Ok(query.count(conn).await? > 0)
}

pub async fn find_ride<C: ConnectionTrait>(conn: &C, ride_id: Uuid) -> Result<ride::Model, BookingError> {
    ride::Entity::find_by_id(ride_id)
        .one(conn)
        .await?
        .ok_or(BookingError::RideNotFound)
}

pub async fn load_aggregate<C: ConnectionTrait>(
    conn: &C,
    ride: ride::Model,
) -> Result<RideAggregate, DbErr> {
    let stops = ride_stop::Entity::find()
        .filter(ride_stop::Column::RideId.eq(ride.id))
        .order_by_asc(ride_stop::Column::Sequence)
        .all(conn)
        .await?;

    let passengers = passenger::Entity::find()
        .filter(passenger::Column::RideId.eq(ride.id))
        .all(conn)
        .await?;

    Ok(RideAggregate {
        ride,
        stops,
        passengers,
    })
}

/// Load aggregates for many rides with two queries instead of two per ride.
pub async fn load_aggregates<C: ConnectionTrait>(
    conn: &C,
    rides: Vec<ride::Model>,
) -> Result<Vec<RideAggregate>, DbErr> {
    if rides.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = rides.iter().map(|r| r.id).collect();
    let stops = ride_stop::Entity::find()
        .filter(ride_stop::Column::RideId.is_in(ids.clone()))
        .order_by_asc(ride_stop::Column::Sequence)
        .all(conn)
        .await?;
    let passengers = passenger::Entity::find()
        .filter(passenger::Column::RideId.is_in(ids))
        .all(conn)
        .await?;

    Ok(rides
        .into_iter()
        .map(|ride| RideAggregate {
            stops: stops.iter().filter(|s| s.ride_id == ride.id).cloned().collect(),
            passengers: passengers
                .iter()
                .filter(|p| p.ride_id == ride.id)
                .cloned()
                .collect(),
            ride,
        })
        .collect())
}

pub async fn insert_children<C: ConnectionTrait>(
    conn: &C,
    ride_id: Uuid,
    stops: &[PlannedStop],
    passengers: &[ValidatedPassenger],
) -> Result<(Vec<ride_stop::Model>, Vec<passenger::Model>), DbErr> {
    let mut stop_models = Vec::with_capacity(stops.len());
    for stop in stops {
        let model = ride_stop::ActiveModel {
            id: Set(Uuid::new_v4()),
            ride_id: Set(ride_id),
            sequence: Set(stop.sequence),
            lat: Set(stop.lat),
            lng: Set(stop.lng),
            address: Set(stop.address.clone()),
            stop_type: Set(stop.stop_type),
        }
        .insert(conn)
        .await?;
        stop_models.push(model);
    }

    let mut passenger_models = Vec::with_capacity(passengers.len());
    for p in passengers {
        let model = passenger::ActiveModel {
            id: Set(Uuid::new_v4()),
            ride_id: Set(ride_id),
            name: Set(p.name.clone()),
            email: Set(p.email.clone()),
            phone: Set(p.phone.clone()),
        }
        .insert(conn)
        .await?;
        passenger_models.push(model);
    }

    Ok((stop_models, passenger_models))
}

/// Drop and recreate a ride's stops and passengers. Must run in the same
/// transaction as the parent update.
pub async fn replace_children<C: ConnectionTrait>(
    conn: &C,
    ride_id: Uuid,
    stops: &[PlannedStop],
    passengers: &[ValidatedPassenger],
) -> Result<(Vec<ride_stop::Model>, Vec<passenger::Model>), DbErr> {
    ride_stop::Entity::delete_many()
        .filter(ride_stop::Column::RideId.eq(ride_id))
        .exec(conn)
        .await?;
    passenger::Entity::delete_many()
        .filter(passenger::Column::RideId.eq(ride_id))
        .exec(conn)
        .await?;

    insert_children(conn, ride_id, stops, passengers).await
}

/// Apply `changes` only if the stored status still equals `expected`.
/// Returns false when another writer got there first.
pub async fn update_if_status<C: ConnectionTrait>(
    conn: &C,
    ride_id: Uuid,
    expected: RideStatus,
    changes: ride::ActiveModel,
) -> Result<bool, DbErr> {
    let result = ride::Entity::update_many()
        .set(changes)
        .filter(ride::Column::Id.eq(ride_id))
        .filter(ride::Column::Status.eq(expected))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}
