#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use uuid::Uuid;

use ride_booking_backend::booking::trip::{Location, PassengerInput, TripRequest};
use ride_booking_backend::booking::{BookingOutcome, Caller, RideAggregate};
use ride_booking_backend::entities::user::UserRole;
use ride_booking_backend::entities::{car, contract, user};

/// Fresh in-memory database with the schema applied.
pub async fn setup() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

/// Monday 2026-10-19 00:00 UTC
pub fn now() -> DateTime<Utc> {
    "2026-10-19T00:00:00Z".parse().unwrap()
}

pub async fn create_user(db: &DatabaseConnection, role: UserRole, name: &str) -> Caller {
    let user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(format!("{}@example.com", name)),
        username: Set(name.to_string()),
        password_hash: Set("not-a-real-hash".to_string()),
        role: Set(role),
        is_active: Set(true),
        vehicle_type: Set(None),
        license_plate: Set(None),
        current_location_lat: Set(None),
        current_location_lng: Set(None),
        created_at: Set(now().fixed_offset()),
    }
    .insert(db)
    .await
    .unwrap();

    Caller::new(user.id, role)
}

pub async fn create_car(db: &DatabaseConnection, plate: &str, is_active: bool) -> car::Model {
    car::ActiveModel {
        id: Set(Uuid::new_v4()),
        model: Set("Toyota Camry".to_string()),
        license_plate: Set(plate.to_string()),
        is_active: Set(is_active),
        created_at: Set(now().fixed_offset()),
    }
    .insert(db)
    .await
    .unwrap()
}

/// Monday to Friday, 08:00 to 18:00, through 2027.
/// `order` spaces out creation times so list order is deterministic.
pub async fn create_contract(
    db: &DatabaseConnection,
    rider: &Caller,
    car: &car::Model,
    monthly_km_limit: f64,
    order: i64,
) -> contract::Model {
    contract::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(rider.user_id),
        car_id: Set(car.id),
        monthly_km_limit: Set(monthly_km_limit),
        start_date: Set(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()),
        end_date: Set(NaiveDate::from_ymd_opt(2028, 1, 1).unwrap()),
        daily_start_time: Set(NaiveTime::from_hms_opt(8, 0, 0).unwrap()),
        daily_end_time: Set(NaiveTime::from_hms_opt(18, 0, 0).unwrap()),
        working_days: Set("1,2,3,4,5".to_string()),
        created_at: Set((now() - chrono::Duration::days(30 - order)).fixed_offset()),
    }
    .insert(db)
    .await
    .unwrap()
}

fn location(lat: f64, lng: f64, address: &str) -> Location {
    Location {
        lat,
        lng,
        address: Some(address.to_string()),
    }
}

/// A trip across town with a fixed distance and one passenger.
pub fn trip(pickup_datetime: &str, distance_km: f64) -> TripRequest {
    TripRequest {
        pickup_datetime: pickup_datetime.to_string(),
        pickup: location(40.7128, -74.0060, "City Hall"),
        dropoff: location(40.7580, -73.9855, "Times Square"),
        stops: Vec::new(),
        distance_km: Some(distance_km),
        route_data: None,
        estimated_duration_hours: None,
        passengers: vec![PassengerInput {
            name: "Jane Doe".to_string(),
            email: Some("jane@example.com".to_string()),
            phone: None,
        }],
        contract_id: None,
        confirm_overtime: false,
    }
}

pub fn with_stop(mut request: TripRequest, lat: f64, lng: f64) -> TripRequest {
    request.stops.push(location(lat, lng, "Midtown"));
    request
}

pub fn booked(outcome: BookingOutcome) -> RideAggregate {
    match outcome {
        BookingOutcome::Booked(aggregate) => aggregate,
        other => panic!("expected a booked ride, got {:?}", other),
    }
}
