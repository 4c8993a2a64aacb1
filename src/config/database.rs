//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! The `transactions` table is generated from the entity definition with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust model
//! without hand-written SQL.

use crate::entities::Transaction;
use crate::errors::{Error, Result};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::Path;
use tracing::{debug, info};

/// Opens a connection to the ledger database.
///
/// For file-backed `SQLite` URLs the parent directory is created first, so the default
/// `sqlite://data/...` location works on a fresh checkout.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection> {
    if let Some(dir) = sqlite_parent_dir(database_url) {
        debug!("Ensuring database directory exists: {}", dir.display());
        std::fs::create_dir_all(dir)?;
    }

    let db = Database::connect(database_url).await.map_err(|e| Error::Config {
        message: format!("Failed to open database at {database_url}: {e}"),
    })?;
    info!("Database connection opened.");
    Ok(db)
}

fn sqlite_parent_dir(database_url: &str) -> Option<&Path> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Path::new(path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
}

/// Creates the `transactions` table if it does not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut transaction_table = schema.create_table_from_entity(Transaction);
    let statement = builder.build(&*transaction_table.if_not_exists());

    db.execute(statement).await?;
    info!("Database tables ensured.");

    Ok(())
}

/// Connects and makes sure the schema is in place.
pub async fn init_db(database_url: &str) -> Result<DatabaseConnection> {
    let db = connect(database_url).await?;
    create_tables(&db).await?;
    Ok(db)
}
