use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_users::User;
use super::m20250301_000002_create_cars::Car;
use super::m20250301_000003_create_contracts::Contract;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ride::Table)
                    .if_not_exists()
                    .col(uuid(Ride::Id).primary_key())
                    .col(uuid(Ride::RiderId).not_null())
                    .col(uuid_null(Ride::DriverId))
                    .col(uuid_null(Ride::CarId))
                    .col(uuid_null(Ride::ContractId))
                    .col(double(Ride::PickupLat).not_null())
                    .col(double(Ride::PickupLng).not_null())
                    .col(double(Ride::DropoffLat).not_null())
                    .col(double(Ride::DropoffLng).not_null())
                    .col(string_len_null(Ride::PickupAddress, 255))
                    .col(string_len_null(Ride::DropoffAddress, 255))
                    .col(timestamp_with_time_zone(Ride::PickupDatetime).not_null())
                    .col(double(Ride::Distance).not_null())
                    .col(double(Ride::Fare).not_null())
                    .col(text_null(Ride::RouteData))
                    .col(double_null(Ride::EstimatedDurationHours))
                    .col(boolean(Ride::IsOvertime).not_null().default(false))
                    .col(string_len(Ride::Status, 20).not_null().default("pending"))
                    .col(
                        timestamp_with_time_zone(Ride::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Ride::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_rider")
                            .from(Ride::Table, Ride::RiderId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_driver")
                            .from(Ride::Table, Ride::DriverId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_car")
                            .from(Ride::Table, Ride::CarId)
                            .to(Car::Table, Car::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_contract")
                            .from(Ride::Table, Ride::ContractId)
                            .to(Contract::Table, Contract::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Overlap checks scan by car and pickup time
        manager
            .create_index(
                Index::create()
                    .name("idx_ride_car_pickup")
                    .table(Ride::Table)
                    .col(Ride::CarId)
                    .col(Ride::PickupDatetime)
                    .to_owned(),
            )
            .await?;

        // Monthly usage sums by contract and status
        manager
            .create_index(
                Index::create()
                    .name("idx_ride_contract_status")
                    .table(Ride::Table)
                    .col(Ride::ContractId)
                    .col(Ride::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ride::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Ride {
    Table,
    Id,
    RiderId,
    DriverId,
    CarId,
    ContractId,
    PickupLat,
    PickupLng,
    DropoffLat,
    DropoffLng,
    PickupAddress,
    DropoffAddress,
    PickupDatetime,
    Distance,
    Fare,
    RouteData,
    EstimatedDurationHours,
    IsOvertime,
    Status,
    CreatedAt,
    UpdatedAt,
}
