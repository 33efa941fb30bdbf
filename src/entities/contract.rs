use std::collections::BTreeSet;

use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A rider's monthly contract on one car.
///
/// The contract covers `[start_date, end_date)`, a daily window
/// `[daily_start_time, daily_end_time]` and a set of ISO weekdays
/// (1 = Monday .. 7 = Sunday) stored as a comma separated list.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contract")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub car_id: Uuid,
    pub monthly_km_limit: f64,
    pub start_date: Date,
    pub end_date: Date,
    pub daily_start_time: Time,
    pub daily_end_time: Time,
    pub working_days: String,
    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Weekday numbers the contract works on. Entries that are not a
    /// weekday number are skipped one by one; the rest still apply.
    pub fn working_day_set(&self) -> BTreeSet<u32> {
        self.working_days
            .split(',')
            .filter_map(|part| part.trim().parse::<u32>().ok())
            .filter(|day| (1..=7).contains(day))
            .collect()
    }

    pub fn covers_date(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date < self.end_date
    }
}

/// Parse "1,2,3" into a weekday set, rejecting anything outside 1..=7.
pub fn parse_working_days(raw: &str) -> Option<BTreeSet<u32>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u32>().ok().filter(|day| (1..=7).contains(day)))
        .collect()
}

pub fn format_working_days(days: &BTreeSet<u32>) -> String {
    days.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::car::Entity",
        from = "Column::CarId",
        to = "super::car::Column::Id"
    )]
    Car,
    #[sea_orm(has_many = "super::ride::Entity")]
    Rides,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::car::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Car.def()
    }
}

impl Related<super::ride::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rides.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
