use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::{
    lifecycle, repository, service, trip::parse_pickup_datetime, BookingError, BookingOutcome,
    Caller, ContractStatus, RideAggregate, TripRequest,
};
use crate::entities::ride;
use crate::error::AppResult;
use crate::handlers::notify;
use crate::notifications::RideEvent;
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RiderDashboard {
    pub rides: Vec<RideAggregate>,
    /// Usage and availability of each contract as of now
    pub contracts: Vec<ContractStatus>,
}

/// Rider's rides (newest first) and per-contract monthly usage
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<RiderDashboard>> {
    let caller = Caller::from(&claims);

    let rides = ride::Entity::find()
        .filter(ride::Column::RiderId.eq(caller.user_id))
        .order_by_desc(ride::Column::CreatedAt)
        .all(&state.db)
        .await?;
    let rides = repository::load_aggregates(&state.db, rides).await?;

    let contracts =
        service::contract_statuses(&state.db, &caller, Utc::now().fixed_offset(), None, None)
            .await?;

    Ok(Json(RiderDashboard { rides, contracts }))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub pickup_datetime: String,
    pub distance_km: Option<f64>,
    /// Ride being edited, ignored by the overlap check
    pub ride_id: Option<Uuid>,
}

/// Pre-check every contract against a prospective pickup time
pub async fn contract_availability(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<Vec<ContractStatus>>> {
    let caller = Caller::from(&claims);
    let pickup = parse_pickup_datetime(&query.pickup_datetime)?;

    let statuses =
        service::contract_statuses(&state.db, &caller, pickup, query.distance_km, query.ride_id)
            .await?;

    Ok(Json(statuses))
}

fn outcome_status(outcome: &BookingOutcome, booked: StatusCode) -> StatusCode {
    match outcome {
        BookingOutcome::Booked(_) => booked,
        BookingOutcome::NeedsConfirmation { .. } => StatusCode::OK,
    }
}

/// Book a ride
pub async fn book_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<TripRequest>,
) -> AppResult<(StatusCode, Json<BookingOutcome>)> {
    let caller = Caller::from(&claims);
    let outcome = service::book(&state.db, &caller, payload, Utc::now()).await?;

    if let BookingOutcome::Booked(aggregate) = &outcome {
        notify(&state, RideEvent::Booked, &aggregate.ride).await;
    }

    Ok((outcome_status(&outcome, StatusCode::CREATED), Json(outcome)))
}

/// Get one of the rider's rides
pub async fn get_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ride_id): Path<Uuid>,
) -> AppResult<Json<RideAggregate>> {
    let ride = repository::find_ride(&state.db, ride_id).await?;
    if ride.rider_id != claims.sub {
        return Err(BookingError::NotRideOwner.into());
    }

    Ok(Json(repository::load_aggregate(&state.db, ride).await?))
}

/// Replace the trip details of a pending ride
pub async fn edit_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ride_id): Path<Uuid>,
    Json(payload): Json<TripRequest>,
) -> AppResult<(StatusCode, Json<BookingOutcome>)> {
    let caller = Caller::from(&claims);
    let outcome = service::edit(&state.db, &caller, ride_id, payload, Utc::now()).await?;

    if let BookingOutcome::Booked(aggregate) = &outcome {
        notify(&state, RideEvent::Updated, &aggregate.ride).await;
    }

    Ok((outcome_status(&outcome, StatusCode::OK), Json(outcome)))
}

/// Cancel a pending ride
pub async fn cancel_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ride_id): Path<Uuid>,
) -> AppResult<Json<ride::Model>> {
    let caller = Caller::from(&claims);
    let ride = lifecycle::cancel(&state.db, &caller, ride_id, Utc::now()).await?;

    notify(&state, RideEvent::Cancelled, &ride).await;
    Ok(Json(ride))
}
