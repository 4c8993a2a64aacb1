//! Transaction business logic - the entry point used by presentation code.
//!
//! [`TransactionService`] wraps the [`LedgerStore`] with input validation and
//! default-filling, and owns the [`Aggregator`] that keeps the running totals. Reads
//! are straight pass-throughs to the store; validation, not-found and storage errors
//! reach the caller unchanged.

use crate::{
    core::{
        aggregator::{Aggregator, Totals},
        ledger::{LedgerStore, NewTransaction, record_violations},
    },
    entities::TransactionModel,
    errors::{Error, Result, Violation},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

/// Title, amount and category rules shared by adding and editing.
fn validate_entry(title: &str, amount: f64, category: &str) -> Result<()> {
    let mut violations = record_violations(title, amount);
    if category.trim().is_empty() {
        violations.push(Violation {
            field: "category",
            reason: "must not be empty",
        });
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation { violations })
    }
}

fn clean_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToString::to_string)
}

/// Façade over the ledger store and its aggregator.
pub struct TransactionService {
    store: Arc<LedgerStore>,
    aggregator: Aggregator,
}

impl TransactionService {
    /// Builds the service and starts aggregating the store's snapshots.
    ///
    /// Must be called from inside a tokio runtime.
    #[must_use]
    pub fn new(store: Arc<LedgerStore>) -> Self {
        let aggregator = Aggregator::spawn(&store);
        Self { store, aggregator }
    }

    /// The underlying store, for wiring the sync coordinator.
    #[must_use]
    pub const fn store(&self) -> &Arc<LedgerStore> {
        &self.store
    }

    /// Records a new transaction and returns its id.
    ///
    /// Every violated field is reported in a single `Validation` error: a blank title, a
    /// missing or blank category, or an amount that is not a positive number. `date`
    /// defaults to now; a blank description is stored as `None`.
    pub async fn add_transaction(
        &self,
        title: &str,
        amount: f64,
        is_income: bool,
        category: &str,
        date: Option<DateTime<Utc>>,
        description: Option<&str>,
    ) -> Result<i64> {
        validate_entry(title, amount, category)?;

        self.store
            .insert(NewTransaction {
                title: title.trim().to_string(),
                amount,
                is_income,
                category: category.trim().to_string(),
                date: date.unwrap_or_else(Utc::now),
                description: clean_description(description),
            })
            .await
    }

    /// Replaces an existing transaction, with the same rules and trimming as
    /// [`TransactionService::add_transaction`].
    pub async fn edit_transaction(&self, mut transaction: TransactionModel) -> Result<()> {
        validate_entry(&transaction.title, transaction.amount, &transaction.category)?;

        transaction.title = transaction.title.trim().to_string();
        transaction.category = transaction.category.trim().to_string();
        transaction.description = clean_description(transaction.description.as_deref());
        self.store.update(transaction).await
    }

    /// Deletes a transaction; removing a missing id is `NotFound`.
    pub async fn remove_transaction(&self, id: i64) -> Result<()> {
        self.store.delete(id).await
    }

    /// All transactions, newest first.
    pub async fn get_all(&self) -> Result<Vec<TransactionModel>> {
        self.store.get_all().await
    }

    /// One transaction by id.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<TransactionModel>> {
        self.store.get_by_id(id).await
    }

    /// Transactions dated within `[start, end]`, newest first.
    pub async fn query_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TransactionModel>> {
        self.store.query_by_date_range(start, end).await
    }

    /// Income or expense transactions only, newest first.
    pub async fn query_by_type(&self, is_income: bool) -> Result<Vec<TransactionModel>> {
        self.store.query_by_type(is_income).await
    }

    /// Transactions still waiting for the cloud sync.
    pub async fn query_unsynced(&self) -> Result<Vec<TransactionModel>> {
        self.store.query_unsynced().await
    }

    /// Current income, expense and balance.
    #[must_use]
    pub fn totals(&self) -> Totals {
        self.aggregator.totals()
    }

    /// Live totals, starting with the current value.
    #[must_use]
    pub fn subscribe_totals(&self) -> watch::Receiver<Totals> {
        self.aggregator.subscribe()
    }
}
