use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000004_create_rides::Ride;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Passenger::Table)
                    .if_not_exists()
                    .col(uuid(Passenger::Id).primary_key())
                    .col(uuid(Passenger::RideId).not_null())
                    .col(string_len(Passenger::Name, 100).not_null())
                    .col(string_len_null(Passenger::Email, 120))
                    .col(string_len_null(Passenger::Phone, 20))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_passenger_ride")
                            .from(Passenger::Table, Passenger::RideId)
                            .to(Ride::Table, Ride::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Passenger::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Passenger {
    Table,
    Id,
    RideId,
    Name,
    Email,
    Phone,
}
