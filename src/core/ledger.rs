//! Ledger store - durable storage and querying of transactions.
//!
//! The store owns the database connection and is the single mutation path for the
//! `transactions` table. Every insert, update, delete and sync-flag flip runs under one
//! async mutex inside a database transaction; the fresh snapshot of the whole ledger is
//! read inside that same transaction and published on a `watch` channel once it commits,
//! so subscribers see snapshots in exactly the order mutations were applied.

use crate::{
    entities::{Transaction, TransactionModel, transaction},
    errors::{Error, Result, Violation},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    DatabaseTransaction, QueryOrder, Select, Set, TransactionTrait, prelude::*,
};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument};

/// Full ordered content of the ledger at one point in time.
pub type Snapshot = Arc<Vec<TransactionModel>>;

/// A transaction as submitted for insertion, before the store assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// Short label
    pub title: String,
    /// Positive magnitude
    pub amount: f64,
    /// Direction of the transaction
    pub is_income: bool,
    /// Free-text category
    pub category: String,
    /// Point in time the transaction is attributed to
    pub date: DateTime<Utc>,
    /// Optional notes
    pub description: Option<String>,
}

/// Checks the rules every stored record must satisfy.
pub(crate) fn record_violations(title: &str, amount: f64) -> Vec<Violation> {
    let mut violations = Vec::new();
    if title.trim().is_empty() {
        violations.push(Violation {
            field: "title",
            reason: "must not be empty",
        });
    }
    if !amount.is_finite() || amount <= 0.0 {
        violations.push(Violation {
            field: "amount",
            reason: "must be a finite number greater than zero",
        });
    }
    violations
}

fn ensure_valid(title: &str, amount: f64) -> Result<()> {
    let violations = record_violations(title, amount);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation { violations })
    }
}

/// Newest first; equal dates fall back to insertion order, newest first.
fn newest_first(select: Select<Transaction>) -> Select<Transaction> {
    select
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id)
}

/// Durable, serialized store of ledger transactions.
pub struct LedgerStore {
    db: DatabaseConnection,
    write_lock: Mutex<()>,
    snapshots: watch::Sender<Snapshot>,
}

impl LedgerStore {
    /// Wraps an initialized database connection and loads the initial snapshot.
    pub async fn open(db: DatabaseConnection) -> Result<Self> {
        let initial = load_all(&db).await?;
        info!("Ledger store opened with {} transactions", initial.len());
        let (snapshots, _) = watch::channel(Arc::new(initial));
        Ok(Self {
            db,
            write_lock: Mutex::new(()),
            snapshots,
        })
    }

    /// Subscribes to ledger snapshots.
    ///
    /// The receiver holds the latest snapshot right away and is notified after every
    /// mutation. A slow receiver only ever sees the most recent snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.subscribe()
    }

    /// The most recently published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.snapshots.borrow())
    }

    /// Persists a new transaction and returns its id.
    ///
    /// The record starts unsynced. Nothing is written when validation fails.
    #[instrument(skip(self, new), fields(title = %new.title))]
    pub async fn insert(&self, new: NewTransaction) -> Result<i64> {
        ensure_valid(&new.title, new.amount)?;

        let _guard = self.write_lock.lock().await;
        let txn = self.db.begin().await?;
        let model = transaction::ActiveModel {
            title: Set(new.title),
            amount: Set(new.amount),
            is_income: Set(new.is_income),
            category: Set(new.category),
            date: Set(new.date),
            description: Set(new.description),
            synced_with_cloud: Set(false),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        self.commit_and_publish(txn).await?;

        info!(
            "Inserted transaction {}: income={}, amount={:.2}, category='{}'",
            model.id, model.is_income, model.amount, model.category
        );
        Ok(model.id)
    }

    /// Replaces the user-editable fields of the record with the same id.
    ///
    /// `synced_with_cloud` is kept as stored whatever the incoming value says; only
    /// [`LedgerStore::mark_synced`] flips it.
    #[instrument(skip(self, updated), fields(id = updated.id))]
    pub async fn update(&self, updated: TransactionModel) -> Result<()> {
        ensure_valid(&updated.title, updated.amount)?;

        let _guard = self.write_lock.lock().await;
        let txn = self.db.begin().await?;
        let existing = Transaction::find_by_id(updated.id)
            .one(&txn)
            .await?
            .ok_or(Error::NotFound { id: updated.id })?;

        let mut active: transaction::ActiveModel = existing.into();
        active.title = Set(updated.title);
        active.amount = Set(updated.amount);
        active.is_income = Set(updated.is_income);
        active.category = Set(updated.category);
        active.date = Set(updated.date);
        active.description = Set(updated.description);
        active.update(&txn).await?;
        self.commit_and_publish(txn).await?;

        info!("Updated transaction {}", updated.id);
        Ok(())
    }

    /// Hard-deletes a transaction. Deleting a missing id, including a second delete of the
    /// same id, is reported as `NotFound`.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let txn = self.db.begin().await?;
        let result = Transaction::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(Error::NotFound { id });
        }
        self.commit_and_publish(txn).await?;

        info!("Deleted transaction {}", id);
        Ok(())
    }

    /// Flips `synced_with_cloud` to `true` without touching any other column.
    ///
    /// Returns `false` when the record was already synced (no notification is sent).
    #[instrument(skip(self))]
    pub async fn mark_synced(&self, id: i64) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let txn = self.db.begin().await?;
        let existing = Transaction::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(Error::NotFound { id })?;
        if existing.synced_with_cloud {
            debug!("Transaction {} already synced", id);
            return Ok(false);
        }

        let mut active: transaction::ActiveModel = existing.into();
        active.synced_with_cloud = Set(true);
        active.update(&txn).await?;
        self.commit_and_publish(txn).await?;

        debug!("Transaction {} marked as synced", id);
        Ok(true)
    }

    /// All transactions, newest first.
    pub async fn get_all(&self) -> Result<Vec<TransactionModel>> {
        load_all(&self.db).await
    }

    /// Looks up one transaction.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<TransactionModel>> {
        Transaction::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Transactions dated within `[start, end]`, both bounds included, newest first.
    pub async fn query_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TransactionModel>> {
        newest_first(
            Transaction::find().filter(transaction::Column::Date.between(start, end)),
        )
        .all(&self.db)
        .await
        .map_err(Into::into)
    }

    /// Only income (`true`) or only expense (`false`) transactions, newest first.
    pub async fn query_by_type(&self, is_income: bool) -> Result<Vec<TransactionModel>> {
        newest_first(Transaction::find().filter(transaction::Column::IsIncome.eq(is_income)))
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Transactions not yet written to the remote store, oldest first.
    pub async fn query_unsynced(&self) -> Result<Vec<TransactionModel>> {
        Transaction::find()
            .filter(transaction::Column::SyncedWithCloud.eq(false))
            .order_by_asc(transaction::Column::Id)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn commit_and_publish(&self, txn: DatabaseTransaction) -> Result<()> {
        let snapshot = load_all(&txn).await?;
        txn.commit().await?;
        debug!("Publishing snapshot of {} transactions", snapshot.len());
        self.snapshots.send_replace(Arc::new(snapshot));
        Ok(())
    }
}

async fn load_all<C: ConnectionTrait>(db: &C) -> Result<Vec<TransactionModel>> {
    newest_first(Transaction::find())
        .all(db)
        .await
        .map_err(Into::into)
}
