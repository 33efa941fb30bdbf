//! Trip input: parsing and validation of a booking request before any write.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::BookingError;
use crate::entities::ride_stop::StopType;
use crate::utils::geo::{is_valid_coordinate, path_length_km};

pub const FARE_PER_KM: f64 = 2.0;
pub const BASE_FARE: f64 = 5.0;

/// Flat per-km rate plus base fare, frozen on the ride at booking time.
pub fn compute_fare(distance_km: f64) -> f64 {
    distance_km * FARE_PER_KM + BASE_FARE
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PassengerInput {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TripRequest {
    pub pickup_datetime: String,
    pub pickup: Location,
    pub dropoff: Location,
    /// Intermediate stops in visiting order
    #[serde(default)]
    pub stops: Vec<Location>,
    /// Precomputed route distance; estimated from coordinates when absent
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub route_data: Option<String>,
    #[serde(default)]
    pub estimated_duration_hours: Option<f64>,
    #[serde(default)]
    pub passengers: Vec<PassengerInput>,
    #[serde(default)]
    pub contract_id: Option<Uuid>,
    #[serde(default)]
    pub confirm_overtime: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStop {
    pub sequence: i32,
    pub lat: f64,
    pub lng: f64,
    pub address: Option<String>,
    pub stop_type: StopType,
}

#[derive(Debug, Clone)]
pub struct ValidatedPassenger {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ValidatedTrip {
    pub pickup_at: DateTime<FixedOffset>,
    /// Always pickup first, dropoff last, at least two entries
    pub stops: Vec<PlannedStop>,
    pub distance_km: f64,
    pub fare: f64,
    pub route_data: Option<String>,
    pub estimated_duration_hours: Option<f64>,
    pub passengers: Vec<ValidatedPassenger>,
    pub contract_id: Option<Uuid>,
    pub confirm_overtime: bool,
}

impl ValidatedTrip {
    pub fn pickup(&self) -> &PlannedStop {
        &self.stops[0]
    }

    pub fn dropoff(&self) -> &PlannedStop {
        &self.stops[self.stops.len() - 1]
    }
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// RFC 3339, or a `datetime-local` style value taken as UTC.
pub fn parse_pickup_datetime(raw: &str) -> Result<DateTime<FixedOffset>, BookingError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(BookingError::Validation(
            "pickup_datetime is required".to_string(),
        ));
    }

    let parsed = DateTime::parse_from_rfc3339(raw).ok().or_else(|| {
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc().fixed_offset())
    });

    let parsed = parsed.ok_or_else(|| {
        BookingError::Validation(format!("Unparseable pickup_datetime '{}'", raw))
    })?;

    Ok(parsed.with_nanosecond(0).unwrap_or(parsed))
}

/// Pickup at sequence 0, intermediate stops in submitted order, dropoff last.
pub fn plan_stops(pickup: Location, intermediate: Vec<Location>, dropoff: Location) -> Vec<PlannedStop> {
    let mut stops = Vec::with_capacity(intermediate.len() + 2);

    let typed = std::iter::once((pickup, StopType::Pickup))
        .chain(intermediate.into_iter().map(|s| (s, StopType::Intermediate)))
        .chain(std::iter::once((dropoff, StopType::Dropoff)));

    for (sequence, (location, stop_type)) in typed.enumerate() {
        stops.push(PlannedStop {
            sequence: sequence as i32,
            lat: location.lat,
            lng: location.lng,
            address: non_blank(location.address),
            stop_type,
        });
    }

    stops
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validate a trip request against `now`. Nothing is written here.
pub fn validate_trip(request: TripRequest, now: DateTime<Utc>) -> Result<ValidatedTrip, BookingError> {
    let pickup_at = parse_pickup_datetime(&request.pickup_datetime)?;
    if pickup_at <= now {
        return Err(BookingError::Validation(
            "Pickup time must be in the future".to_string(),
        ));
    }

    let stops = plan_stops(request.pickup, request.stops, request.dropoff);
    for stop in &stops {
        if !is_valid_coordinate(stop.lat, stop.lng) {
            return Err(BookingError::Validation(format!(
                "Invalid coordinates for stop {}: ({}, {})",
                stop.sequence, stop.lat, stop.lng
            )));
        }
    }

    let distance_km = match request.distance_km {
        Some(distance) if !distance.is_finite() || distance < 0.0 => {
            return Err(BookingError::Validation(
                "distance_km must be a non-negative number".to_string(),
            ));
        }
        Some(distance) => distance,
        None => {
            let points: Vec<(f64, f64)> = stops.iter().map(|s| (s.lat, s.lng)).collect();
            path_length_km(&points)
        }
    };

    if let Some(hours) = request.estimated_duration_hours {
        if !hours.is_finite() || hours < 0.0 {
            return Err(BookingError::Validation(
                "estimated_duration_hours must be a non-negative number".to_string(),
            ));
        }
    }

    let mut passengers = Vec::with_capacity(request.passengers.len());
    for (index, passenger) in request.passengers.into_iter().enumerate() {
        let name = passenger.name.trim().to_string();
        if name.is_empty() {
            return Err(BookingError::Validation(format!(
                "Passenger {} is missing a name",
                index + 1
            )));
        }
        passengers.push(ValidatedPassenger {
            name,
            email: non_blank(passenger.email),
            phone: non_blank(passenger.phone),
        });
    }

    Ok(ValidatedTrip {
        pickup_at,
        stops,
        distance_km,
        fare: compute_fare(distance_km),
        route_data: request.route_data,
        estimated_duration_hours: request.estimated_duration_hours,
        passengers,
        contract_id: request.contract_id,
        confirm_overtime: request.confirm_overtime,
    })
}
