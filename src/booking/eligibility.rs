//! Contract eligibility rules.
//!
//! Everything here is pure: callers gather the monthly usage and the overlap
//! check from storage and hand the facts in, so the rules can be exercised
//! without a database.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, TimeZone};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::contract;

/// A booking holds its car for this many hours from pickup.
pub const BOOKING_WINDOW_HOURS: i64 = 2;

pub fn booking_window() -> Duration {
    Duration::hours(BOOKING_WINDOW_HOURS)
}

/// Whether the half-open windows `[a, a + 2h)` and `[b, b + 2h)` intersect.
pub fn windows_overlap(a: DateTime<FixedOffset>, b: DateTime<FixedOffset>) -> bool {
    let window = booking_window();
    a < b + window && b < a + window
}

/// `[start of month, start of next month)` for the calendar month containing
/// `at`, in the offset of `at`.
pub fn month_bounds(
    at: DateTime<FixedOffset>,
) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let first = NaiveDate::from_ymd_opt(at.year(), at.month(), 1)?.and_hms_opt(0, 0, 0)?;
    let next = first.checked_add_months(Months::new(1))?;
    let offset = *at.offset();

    Some((
        offset.from_local_datetime(&first).single()?,
        offset.from_local_datetime(&next).single()?,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Warning {
    ConflictingBooking,
    MonthlyLimitExceeded,
    NotWorkingDay,
    OutsideWorkingHours,
}

impl Warning {
    pub fn message(self) -> &'static str {
        match self {
            Warning::ConflictingBooking => "The car already has a booking around this time",
            Warning::MonthlyLimitExceeded => "Monthly kilometer limit would be exceeded",
            Warning::NotWorkingDay => {
                "Pickup is not on a contracted working day and will be charged as overtime"
            }
            Warning::OutsideWorkingHours => {
                "Pickup is outside contracted hours and will be charged as overtime"
            }
        }
    }
}

/// Facts about a contract that come from ride history.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageSnapshot {
    pub monthly_usage_km: f64,
    pub has_conflicting_booking: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractStatus {
    pub contract_id: Uuid,
    pub car_id: Uuid,
    pub monthly_usage_km: f64,
    pub monthly_km_limit: f64,
    pub is_working_day: bool,
    pub is_within_hours: bool,
    pub has_conflicting_booking: bool,
    pub over_budget: bool,
    pub overtime: bool,
    pub warning: Option<Warning>,
    pub message: Option<&'static str>,
    pub selectable: bool,
}

impl ContractStatus {
    /// Inside contracted days and hours, free car, budget left.
    pub fn is_regular(&self) -> bool {
        self.is_working_day
            && self.is_within_hours
            && !self.has_conflicting_booking
            && !self.over_budget
    }

    /// Bookable only with an overtime acknowledgement.
    pub fn is_overtime_eligible(&self) -> bool {
        !self.is_regular() && !self.has_conflicting_booking && !self.over_budget
    }

    pub fn remaining_km(&self) -> f64 {
        (self.monthly_km_limit - self.monthly_usage_km).max(0.0)
    }
}

/// Classify `contract` for a pickup at `pickup`.
///
/// With a requested distance the budget check is `usage + distance > limit`;
/// without one (display pre-check) it is `usage >= limit`.
pub fn evaluate(
    contract: &contract::Model,
    pickup: DateTime<FixedOffset>,
    usage: UsageSnapshot,
    requested_distance_km: Option<f64>,
) -> ContractStatus {
    let weekday = pickup.weekday().number_from_monday();
    let is_working_day = contract.working_day_set().contains(&weekday);

    let time_of_day = pickup.time();
    let is_within_hours =
        contract.daily_start_time <= time_of_day && time_of_day <= contract.daily_end_time;

    let over_budget = match requested_distance_km {
        Some(distance) => usage.monthly_usage_km + distance > contract.monthly_km_limit,
        None => usage.monthly_usage_km >= contract.monthly_km_limit,
    };

    let overtime = !is_working_day || !is_within_hours;

    let warning = if usage.has_conflicting_booking {
        Some(Warning::ConflictingBooking)
    } else if over_budget {
        Some(Warning::MonthlyLimitExceeded)
    } else if !is_working_day {
        Some(Warning::NotWorkingDay)
    } else if !is_within_hours {
        Some(Warning::OutsideWorkingHours)
    } else {
        None
    };

    ContractStatus {
        contract_id: contract.id,
        car_id: contract.car_id,
        monthly_usage_km: usage.monthly_usage_km,
        monthly_km_limit: contract.monthly_km_limit,
        is_working_day,
        is_within_hours,
        has_conflicting_booking: usage.has_conflicting_booking,
        over_budget,
        overtime,
        warning,
        message: warning.map(Warning::message),
        selectable: !usage.has_conflicting_booking,
    }
}

#[derive(Debug, PartialEq)]
pub enum Selection<'a> {
    Regular(&'a ContractStatus),
    Overtime(&'a ContractStatus),
    Unavailable,
}

/// First regular contract in list order, else the first overtime-eligible one.
pub fn select_contract(statuses: &[ContractStatus]) -> Selection<'_> {
    if let Some(status) = statuses.iter().find(|s| s.is_regular()) {
        return Selection::Regular(status);
    }

    statuses
        .iter()
        .find(|s| s.is_overtime_eligible())
        .map(Selection::Overtime)
        .unwrap_or(Selection::Unavailable)
}
