//! Migration runner for the Folio ledger schema.
//!
//! Usage:
//!   migrator up      - Apply pending migrations
//!   migrator down    - Roll back the last migration
//!   migrator status  - Show applied and pending migrations
//!   migrator fresh   - Drop every table and migrate from scratch
//!
//! The target database is read from `DATABASE_URL`.

use folio_db::Migrator;
use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // sea-orm-migration installs its own subscriber
    cli::run_cli(Migrator).await;
}
