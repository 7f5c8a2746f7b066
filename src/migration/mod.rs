// ABOUTME: SeaORM migration module for database schema management
// ABOUTME: Handles initial schema creation for media assets and content documents

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20261019_000001_create_media_tables::Migration)]
    }
}

pub mod m20261019_000001_create_media_tables;
