use std::collections::BTreeSet;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::{repository, RideAggregate};
use crate::entities::contract::{format_working_days, parse_working_days};
use crate::entities::user::UserRole;
use crate::entities::{car, contract, ride, user};
use crate::error::{AppError, AppResult};
use crate::utils::jwt::Claims;
use crate::AppState;

// ============ Dashboard ============

#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    pub users: Vec<user::Model>,
    pub rides: Vec<RideAggregate>,
    pub cars: Vec<car::Model>,
    pub contracts: Vec<contract::Model>,
}

pub async fn dashboard(State(state): State<AppState>) -> AppResult<Json<AdminDashboard>> {
    let users = user::Entity::find()
        .order_by_asc(user::Column::CreatedAt)
        .all(&state.db)
        .await?;
    let rides = ride::Entity::find()
        .order_by_desc(ride::Column::CreatedAt)
        .all(&state.db)
        .await?;
    let cars = car::Entity::find()
        .order_by_asc(car::Column::Model)
        .all(&state.db)
        .await?;
    let contracts = contract::Entity::find()
        .order_by_asc(contract::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(AdminDashboard {
        users,
        rides: repository::load_aggregates(&state.db, rides).await?,
        cars,
        contracts,
    }))
}

// ============ User Management ============

/// Flip a user's active flag. Admins cannot deactivate themselves.
pub async fn toggle_user_active(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<user::Model>> {
    if user_id == claims.sub {
        return Err(AppError::BadRequest(
            "You cannot deactivate your own account".to_string(),
        ));
    }

    let existing = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let is_active = !existing.is_active;
    let mut active: user::ActiveModel = existing.into();
    active.is_active = Set(is_active);
    let updated = active.update(&state.db).await?;

    tracing::info!(user_id = %user_id, is_active, "User active flag toggled");
    Ok(Json(updated))
}

// ============ Car Management ============

#[derive(Debug, Deserialize)]
pub struct CreateCarRequest {
    pub model: String,
    pub license_plate: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCarRequest {
    pub model: Option<String>,
    pub license_plate: Option<String>,
}

fn required(value: &str, field: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

async fn ensure_plate_free(
    state: &AppState,
    license_plate: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    let mut query = car::Entity::find().filter(car::Column::LicensePlate.eq(license_plate));
    if let Some(id) = except {
        query = query.filter(car::Column::Id.ne(id));
    }

    if query.one(&state.db).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "License plate {} is already registered",
            license_plate
        )));
    }
    Ok(())
}

pub async fn list_cars(State(state): State<AppState>) -> AppResult<Json<Vec<car::Model>>> {
    let cars = car::Entity::find()
        .order_by_asc(car::Column::Model)
        .all(&state.db)
        .await?;
    Ok(Json(cars))
}

pub async fn create_car(
    State(state): State<AppState>,
    Json(payload): Json<CreateCarRequest>,
) -> AppResult<(StatusCode, Json<car::Model>)> {
    let model = required(&payload.model, "Model")?;
    let license_plate = required(&payload.license_plate, "License plate")?.to_uppercase();
    ensure_plate_free(&state, &license_plate, None).await?;

    let car = car::ActiveModel {
        id: Set(Uuid::new_v4()),
        model: Set(model),
        license_plate: Set(license_plate),
        is_active: Set(true),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(car)))
}

pub async fn update_car(
    State(state): State<AppState>,
    Path(car_id): Path<Uuid>,
    Json(payload): Json<UpdateCarRequest>,
) -> AppResult<Json<car::Model>> {
    let existing = car::Entity::find_by_id(car_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

    let mut active: car::ActiveModel = existing.into();

    if let Some(model) = payload.model {
        active.model = Set(required(&model, "Model")?);
    }

    if let Some(plate) = payload.license_plate {
        let plate = required(&plate, "License plate")?.to_uppercase();
        ensure_plate_free(&state, &plate, Some(car_id)).await?;
        active.license_plate = Set(plate);
    }

    Ok(Json(active.update(&state.db).await?))
}

/// Take a car out of service or put it back. Cars are never deleted.
pub async fn toggle_car(
    State(state): State<AppState>,
    Path(car_id): Path<Uuid>,
) -> AppResult<Json<car::Model>> {
    let existing = car::Entity::find_by_id(car_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

    let is_active = !existing.is_active;
    let mut active: car::ActiveModel = existing.into();
    active.is_active = Set(is_active);

    tracing::info!(car_id = %car_id, is_active, "Car service flag toggled");
    Ok(Json(active.update(&state.db).await?))
}

// ============ Contract Management ============

#[derive(Debug, Deserialize)]
pub struct CreateContractRequest {
    pub user_id: Uuid,
    pub car_id: Uuid,
    pub monthly_km_limit: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// "HH:MM" or "HH:MM:SS"
    pub daily_start_time: String,
    pub daily_end_time: String,
    /// ISO weekdays, 1 = Monday .. 7 = Sunday
    pub working_days: Vec<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContractRequest {
    pub car_id: Option<Uuid>,
    pub monthly_km_limit: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub daily_start_time: Option<String>,
    pub daily_end_time: Option<String>,
    pub working_days: Option<Vec<u32>>,
}

/// Contract terms after parsing, checked as a whole
#[derive(Debug, Clone, PartialEq)]
struct ContractTerms {
    monthly_km_limit: f64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    daily_start_time: NaiveTime,
    daily_end_time: NaiveTime,
    working_days: BTreeSet<u32>,
}

impl ContractTerms {
    fn validate(&self) -> AppResult<()> {
        if !self.monthly_km_limit.is_finite() || self.monthly_km_limit <= 0.0 {
            return Err(AppError::BadRequest(
                "Monthly km limit must be positive".to_string(),
            ));
        }
        if self.start_date >= self.end_date {
            return Err(AppError::BadRequest(
                "Start date must be before end date".to_string(),
            ));
        }
        if self.daily_start_time > self.daily_end_time {
            return Err(AppError::BadRequest(
                "Daily start time must not be after daily end time".to_string(),
            ));
        }
        if self.working_days.is_empty() {
            return Err(AppError::BadRequest(
                "At least one working day is required".to_string(),
            ));
        }
        if self.working_days.iter().any(|d| !(1..=7).contains(d)) {
            return Err(AppError::BadRequest(
                "Working days must be between 1 (Monday) and 7 (Sunday)".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_time(raw: &str, field: &str) -> AppResult<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| AppError::BadRequest(format!("{} must be HH:MM, got '{}'", field, raw)))
}

async fn ensure_rider(state: &AppState, user_id: Uuid) -> AppResult<()> {
    let user = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.role != UserRole::Rider {
        return Err(AppError::BadRequest(
            "Contracts can only be assigned to riders".to_string(),
        ));
    }
    Ok(())
}

async fn ensure_car(state: &AppState, car_id: Uuid) -> AppResult<()> {
    car::Entity::find_by_id(car_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid car".to_string()))?;
    Ok(())
}

pub async fn list_contracts(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<contract::Model>>> {
    let contracts = contract::Entity::find()
        .order_by_asc(contract::Column::CreatedAt)
        .all(&state.db)
        .await?;
    Ok(Json(contracts))
}

pub async fn create_contract(
    State(state): State<AppState>,
    Json(payload): Json<CreateContractRequest>,
) -> AppResult<(StatusCode, Json<contract::Model>)> {
    let terms = ContractTerms {
        monthly_km_limit: payload.monthly_km_limit,
        start_date: payload.start_date,
        end_date: payload.end_date,
        daily_start_time: parse_time(&payload.daily_start_time, "Daily start time")?,
        daily_end_time: parse_time(&payload.daily_end_time, "Daily end time")?,
        working_days: payload.working_days.into_iter().collect(),
    };
    terms.validate()?;

    ensure_rider(&state, payload.user_id).await?;
    ensure_car(&state, payload.car_id).await?;

    let contract = contract::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(payload.user_id),
        car_id: Set(payload.car_id),
        monthly_km_limit: Set(terms.monthly_km_limit),
        start_date: Set(terms.start_date),
        end_date: Set(terms.end_date),
        daily_start_time: Set(terms.daily_start_time),
        daily_end_time: Set(terms.daily_end_time),
        working_days: Set(format_working_days(&terms.working_days)),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(&state.db)
    .await?;

    tracing::info!(contract_id = %contract.id, user_id = %contract.user_id, "Contract created");
    Ok((StatusCode::CREATED, Json(contract)))
}

pub async fn update_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
    Json(payload): Json<UpdateContractRequest>,
) -> AppResult<Json<contract::Model>> {
    let existing = contract::Entity::find_by_id(contract_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Contract not found".to_string()))?;

    let current_days = parse_working_days(&existing.working_days).unwrap_or_default();
    let terms = ContractTerms {
        monthly_km_limit: payload.monthly_km_limit.unwrap_or(existing.monthly_km_limit),
        start_date: payload.start_date.unwrap_or(existing.start_date),
        end_date: payload.end_date.unwrap_or(existing.end_date),
        daily_start_time: match payload.daily_start_time {
            Some(raw) => parse_time(&raw, "Daily start time")?,
            None => existing.daily_start_time,
        },
        daily_end_time: match payload.daily_end_time {
            Some(raw) => parse_time(&raw, "Daily end time")?,
            None => existing.daily_end_time,
        },
        working_days: payload
            .working_days
            .map(|days| days.into_iter().collect())
            .unwrap_or(current_days),
    };
    terms.validate()?;

    let car_id = match payload.car_id {
        Some(car_id) => {
            ensure_car(&state, car_id).await?;
            car_id
        }
        None => existing.car_id,
    };

    let mut active: contract::ActiveModel = existing.into();
    active.car_id = Set(car_id);
    active.monthly_km_limit = Set(terms.monthly_km_limit);
    active.start_date = Set(terms.start_date);
    active.end_date = Set(terms.end_date);
    active.daily_start_time = Set(terms.daily_start_time);
    active.daily_end_time = Set(terms.daily_end_time);
    active.working_days = Set(format_working_days(&terms.working_days));

    Ok(Json(active.update(&state.db).await?))
}

pub async fn contract_rides(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
) -> AppResult<Json<Vec<RideAggregate>>> {
    contract::Entity::find_by_id(contract_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Contract not found".to_string()))?;

    let rides = repository::rides_for_contract(&state.db, contract_id).await?;
    Ok(Json(repository::load_aggregates(&state.db, rides).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms() -> ContractTerms {
        ContractTerms {
            monthly_km_limit: 1000.0,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
            daily_start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            daily_end_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            working_days: [1, 2, 3, 4, 5].into_iter().collect(),
        }
    }

    #[test]
    fn test_valid_terms() {
        assert!(terms().validate().is_ok());
    }

    #[test]
    fn test_invalid_terms_rejected() {
        let mut zero_limit = terms();
        zero_limit.monthly_km_limit = 0.0;
        assert!(zero_limit.validate().is_err());

        let mut inverted_hours = terms();
        inverted_hours.daily_start_time = NaiveTime::from_hms_opt(19, 0, 0).unwrap();
        assert!(inverted_hours.validate().is_err());

        let mut bad_day = terms();
        bad_day.working_days.insert(8);
        assert!(bad_day.validate().is_err());

        let mut no_days = terms();
        no_days.working_days.clear();
        assert!(no_days.validate().is_err());

        let mut empty_period = terms();
        empty_period.end_date = empty_period.start_date;
        assert!(empty_period.validate().is_err());
    }

    #[test]
    fn test_equal_start_and_end_time_allowed() {
        let mut single_instant = terms();
        single_instant.daily_end_time = single_instant.daily_start_time;
        assert!(single_instant.validate().is_ok());
    }

    #[test]
    fn test_parse_time_formats() {
        assert_eq!(
            parse_time("08:30", "t").unwrap(),
            NaiveTime::from_hms_opt(8, 30, 0).unwrap()
        );
        assert_eq!(
            parse_time("18:00:00", "t").unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap()
        );
        assert!(parse_time("6pm", "t").is_err());
    }
}
