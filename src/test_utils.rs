//! Shared test utilities.
//!
//! This module provides common helper functions for setting up in-memory ledgers,
//! building transactions with sensible defaults, and a scripted remote endpoint for
//! sync tests.

use crate::{
    core::{
        ledger::{LedgerStore, NewTransaction},
        sync::RemoteSync,
    },
    entities::TransactionModel,
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::DatabaseConnection;
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};
use tracing_subscriber::EnvFilter;

/// Installs a test-friendly tracing subscriber once per test binary.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates an empty ledger store on a fresh in-memory database.
pub async fn setup_test_store() -> Result<Arc<LedgerStore>> {
    let db = setup_test_db().await?;
    Ok(Arc::new(LedgerStore::open(db).await?))
}

/// Whole-hour UTC timestamp, so stored dates compare exactly.
///
/// # Panics
/// Panics on an impossible date; only meant for literal test dates.
#[allow(clippy::unwrap_used)]
pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

/// Builds a transaction with sensible defaults.
///
/// # Defaults
/// * `category`: "General"
/// * `description`: None
pub fn new_transaction(
    title: &str,
    amount: f64,
    is_income: bool,
    date: DateTime<Utc>,
) -> NewTransaction {
    NewTransaction {
        title: title.to_string(),
        amount,
        is_income,
        category: "General".to_string(),
        date,
        description: None,
    }
}

/// Remote endpoint that fails for a fixed set of ids and records every push.
#[derive(Debug, Default)]
pub struct ScriptedRemote {
    failing: HashSet<i64>,
    pushed: Mutex<Vec<i64>>,
}

impl ScriptedRemote {
    /// Rejects writes for the given ids, accepts the rest.
    pub fn failing_for(failing: HashSet<i64>) -> Self {
        Self {
            failing,
            pushed: Mutex::new(Vec::new()),
        }
    }

    /// Ids pushed so far, in call order.
    pub fn pushed(&self) -> Vec<i64> {
        self.pushed
            .lock()
            .map(|pushed| pushed.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RemoteSync for ScriptedRemote {
    async fn push(&self, transaction: &TransactionModel) -> Result<()> {
        if let Ok(mut pushed) = self.pushed.lock() {
            pushed.push(transaction.id);
        }
        if self.failing.contains(&transaction.id) {
            return Err(Error::Sync {
                id: transaction.id,
                message: "remote rejected the write".to_string(),
            });
        }
        Ok(())
    }
}
