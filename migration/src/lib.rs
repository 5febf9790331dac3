//! Database migrations for the Sponsor Profile service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_10_19_000001_create_sponsor_profiles;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(
            m2025_10_19_000001_create_sponsor_profiles::Migration,
        )]
    }
}
