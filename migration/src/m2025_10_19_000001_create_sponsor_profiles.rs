//! Migration to create the sponsor_profiles table.
//!
//! The table holds at most one row at a time. The auto-increment key keeps
//! identifiers monotonic across replacements, so a replaced profile's id is
//! never handed out again.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SponsorProfiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SponsorProfiles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SponsorProfiles::Name).text().not_null())
                    .col(
                        ColumnDef::new(SponsorProfiles::CompanyName)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SponsorProfiles::GstNumber).text().null())
                    .col(
                        ColumnDef::new(SponsorProfiles::AnnualTurnover)
                            .double()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SponsorProfiles::TaxRegistrationPath)
                            .text()
                            .null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SponsorProfiles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SponsorProfiles {
    Table,
    Id,
    Name,
    CompanyName,
    GstNumber,
    AnnualTurnover,
    TaxRegistrationPath,
}
