use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Role is stored as a short string ("rider", "driver", "admin")
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    .col(string_len(User::Email, 120).not_null().unique_key())
                    .col(string_len(User::Username, 64).not_null().unique_key())
                    .col(string_len(User::PasswordHash, 256).not_null())
                    .col(string_len(User::Role, 20).not_null())
                    .col(boolean(User::IsActive).not_null().default(true))
                    .col(string_len_null(User::VehicleType, 50))
                    .col(string_len_null(User::LicensePlate, 20))
                    .col(double_null(User::CurrentLocationLat))
                    .col(double_null(User::CurrentLocationLng))
                    .col(
                        timestamp_with_time_zone(User::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum User {
    Table,
    Id,
    Email,
    Username,
    PasswordHash,
    Role,
    IsActive,
    VehicleType,
    LicensePlate,
    CurrentLocationLat,
    CurrentLocationLng,
    CreatedAt,
}
