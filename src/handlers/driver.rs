use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use uuid::Uuid;

use crate::booking::{lifecycle, repository, BookingError, Caller, RideAggregate};
use crate::entities::ride::{self, RideStatus};
use crate::error::AppResult;
use crate::handlers::notify;
use crate::notifications::RideEvent;
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DriverDashboard {
    pub my_rides: Vec<RideAggregate>,
    /// Pending rides nobody has accepted yet
    pub pending_rides: Vec<RideAggregate>,
}

/// The driver's own rides plus the pool of unassigned pending rides
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<DriverDashboard>> {
    let my_rides = ride::Entity::find()
        .filter(ride::Column::DriverId.eq(claims.sub))
        .order_by_desc(ride::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let pending_rides = ride::Entity::find()
        .filter(ride::Column::DriverId.is_null())
        .filter(ride::Column::Status.eq(RideStatus::Pending))
        .order_by_asc(ride::Column::PickupDatetime)
        .all(&state.db)
        .await?;

    Ok(Json(DriverDashboard {
        my_rides: repository::load_aggregates(&state.db, my_rides).await?,
        pending_rides: repository::load_aggregates(&state.db, pending_rides).await?,
    }))
}

/// A ride in the pending pool or assigned to this driver
pub async fn get_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ride_id): Path<Uuid>,
) -> AppResult<Json<RideAggregate>> {
    let ride = repository::find_ride(&state.db, ride_id).await?;

    let in_pool = ride.status == RideStatus::Pending && ride.driver_id.is_none();
    if !in_pool && ride.driver_id != Some(claims.sub) {
        return Err(BookingError::NotAssignedDriver.into());
    }

    Ok(Json(repository::load_aggregate(&state.db, ride).await?))
}

pub async fn accept_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ride_id): Path<Uuid>,
) -> AppResult<Json<ride::Model>> {
    let ride = lifecycle::accept(&state.db, &Caller::from(&claims), ride_id, Utc::now()).await?;
    notify(&state, RideEvent::Accepted, &ride).await;
    Ok(Json(ride))
}

pub async fn start_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ride_id): Path<Uuid>,
) -> AppResult<Json<ride::Model>> {
    let ride = lifecycle::start(&state.db, &Caller::from(&claims), ride_id, Utc::now()).await?;
    notify(&state, RideEvent::Started, &ride).await;
    Ok(Json(ride))
}

pub async fn complete_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ride_id): Path<Uuid>,
) -> AppResult<Json<ride::Model>> {
    let ride = lifecycle::complete(&state.db, &Caller::from(&claims), ride_id, Utc::now()).await?;
    notify(&state, RideEvent::Completed, &ride).await;
    Ok(Json(ride))
}
