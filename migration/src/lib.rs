pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_users;
mod m20250301_000002_create_cars;
mod m20250301_000003_create_contracts;
mod m20250301_000004_create_rides;
mod m20250301_000005_create_ride_stops;
mod m20250301_000006_create_passengers;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users::Migration),
            Box::new(m20250301_000002_create_cars::Migration),
            Box::new(m20250301_000003_create_contracts::Migration),
            Box::new(m20250301_000004_create_rides::Migration),
            Box::new(m20250301_000005_create_ride_stops::Migration),
            Box::new(m20250301_000006_create_passengers::Migration),
        ]
    }
}
