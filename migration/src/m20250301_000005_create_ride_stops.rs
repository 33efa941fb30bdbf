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
                    .table(RideStop::Table)
                    .if_not_exists()
                    .col(uuid(RideStop::Id).primary_key())
                    .col(uuid(RideStop::RideId).not_null())
                    .col(integer(RideStop::Sequence).not_null())
                    .col(double(RideStop::Lat).not_null())
                    .col(double(RideStop::Lng).not_null())
                    .col(string_len_null(RideStop::Address, 255))
                    .col(string_len(RideStop::StopType, 20).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_stop_ride")
                            .from(RideStop::Table, RideStop::RideId)
                            .to(Ride::Table, Ride::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ride_stop_sequence")
                    .table(RideStop::Table)
                    .col(RideStop::RideId)
                    .col(RideStop::Sequence)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RideStop::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum RideStop {
    Table,
    Id,
    RideId,
    Sequence,
    Lat,
    Lng,
    Address,
    StopType,
}
