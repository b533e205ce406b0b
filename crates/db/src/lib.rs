//! Postgres persistence for the Folio ledger.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - [`PgLedgerStore`], the Postgres implementation of the core store seam
//! - Database migrations

mod convert;
pub mod entities;
pub mod migration;
pub mod store;

pub use migration::Migrator;
pub use store::{PgLedgerStore, PgUnitOfWork, map_db_err};

use std::time::Duration;

use folio_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection pool sized from the configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
