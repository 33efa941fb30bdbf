use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_users::User;
use super::m20250301_000002_create_cars::Car;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Contract::Table)
                    .if_not_exists()
                    .col(uuid(Contract::Id).primary_key())
                    .col(uuid(Contract::UserId).not_null())
                    .col(uuid(Contract::CarId).not_null())
                    .col(double(Contract::MonthlyKmLimit).not_null())
                    .col(date(Contract::StartDate).not_null())
                    .col(date(Contract::EndDate).not_null())
                    .col(time(Contract::DailyStartTime).not_null())
                    .col(time(Contract::DailyEndTime).not_null())
                    // Comma separated ISO weekday numbers, e.g. "1,2,3,4,5"
                    .col(string_len(Contract::WorkingDays, 20).not_null())
                    .col(
                        timestamp_with_time_zone(Contract::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contract_user")
                            .from(Contract::Table, Contract::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contract_car")
                            .from(Contract::Table, Contract::CarId)
                            .to(Car::Table, Car::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Contract::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Contract {
    Table,
    Id,
    UserId,
    CarId,
    MonthlyKmLimit,
    StartDate,
    EndDate,
    DailyStartTime,
    DailyEndTime,
    WorkingDays,
    CreatedAt,
}
