//! Balance aggregation over the live ledger.
//!
//! Totals are never stored: each snapshot published by the [`LedgerStore`] is summed
//! again from scratch, so the balance cannot drift away from the records it describes.

use crate::{
    core::ledger::{LedgerStore, Snapshot},
    entities::TransactionModel,
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::trace;

/// Income, expense and balance computed from one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    /// Sum of all income amounts
    pub total_income: f64,
    /// Sum of all expense amounts
    pub total_expense: f64,
    /// `total_income - total_expense`
    pub balance: f64,
}

impl Totals {
    /// Sums a full list of transactions.
    #[must_use]
    pub fn from_transactions(transactions: &[TransactionModel]) -> Self {
        let (total_income, total_expense) =
            transactions
                .iter()
                .fold((0.0, 0.0), |(income, expense), tx| {
                    if tx.is_income {
                        (income + tx.amount, expense)
                    } else {
                        (income, expense + tx.amount)
                    }
                });
        Self {
            total_income,
            total_expense,
            balance: total_income - total_expense,
        }
    }
}

/// Keeps [`Totals`] in step with the ledger.
///
/// A background task listens to store snapshots and republishes totals on its own
/// `watch` channel. Income, expense and balance travel together in one value, so a
/// reader never mixes figures from two snapshots.
pub struct Aggregator {
    snapshots: watch::Receiver<Snapshot>,
    totals: watch::Receiver<Totals>,
    task: JoinHandle<()>,
}

impl Aggregator {
    /// Subscribes to `store` and starts recomputing totals on every change.
    ///
    /// Must be called from inside a tokio runtime.
    #[must_use]
    pub fn spawn(store: &LedgerStore) -> Self {
        let mut feed = store.subscribe();
        let initial = Totals::from_transactions(&feed.borrow_and_update());
        let (publisher, totals) = watch::channel(initial);
        let snapshots = feed.clone();

        let task = tokio::spawn(async move {
            while feed.changed().await.is_ok() {
                let latest = Totals::from_transactions(&feed.borrow_and_update());
                trace!(
                    "Totals recomputed: income={:.2}, expense={:.2}, balance={:.2}",
                    latest.total_income, latest.total_expense, latest.balance
                );
                publisher.send_replace(latest);
            }
        });

        Self {
            snapshots,
            totals,
            task,
        }
    }

    /// Totals of the most recent ledger snapshot.
    #[must_use]
    pub fn totals(&self) -> Totals {
        Totals::from_transactions(&self.snapshots.borrow())
    }

    /// Sum of all income.
    #[must_use]
    pub fn total_income(&self) -> f64 {
        self.totals().total_income
    }

    /// Sum of all expenses.
    #[must_use]
    pub fn total_expense(&self) -> f64 {
        self.totals().total_expense
    }

    /// Income minus expenses.
    #[must_use]
    pub fn balance(&self) -> f64 {
        self.totals().balance
    }

    /// Live totals; the receiver starts with the current value.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Totals> {
        self.totals.clone()
    }
}

impl Drop for Aggregator {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::errors::Result;
    use crate::test_utils::*;
    use std::time::Duration;

    fn expected_balance(transactions: &[TransactionModel]) -> f64 {
        transactions.iter().map(TransactionModel::signed_amount).sum()
    }

    #[tokio::test]
    async fn test_income_expense_scenario() -> Result<()> {
        let store = setup_test_store().await?;
        let aggregator = Aggregator::spawn(&store);
        let date = at(2024, 7, 1, 10);

        let a = store.insert(new_transaction("A", 100.0, true, date)).await?;
        store.insert(new_transaction("B", 40.0, false, date)).await?;
        assert_eq!(
            aggregator.totals(),
            Totals {
                total_income: 100.0,
                total_expense: 40.0,
                balance: 60.0,
            }
        );

        store.delete(a).await?;
        assert_eq!(aggregator.total_income(), 0.0);
        assert_eq!(aggregator.total_expense(), 40.0);
        assert_eq!(aggregator.balance(), -40.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_balance_never_drifts_from_ledger() -> Result<()> {
        let store = setup_test_store().await?;
        let aggregator = Aggregator::spawn(&store);
        let date = at(2024, 7, 1, 10);
        let mut ids = Vec::new();

        for (i, amount) in [12.5, 80.0, 3.25, 19.0, 250.0, 7.75].into_iter().enumerate() {
            let id = store
                .insert(new_transaction("Item", amount, i % 3 == 0, date))
                .await?;
            ids.push(id);
            let all = store.get_all().await?;
            assert!((aggregator.balance() - expected_balance(&all)).abs() < 1e-9);
        }

        for id in ids.iter().step_by(2) {
            store.delete(*id).await?;
            let all = store.get_all().await?;
            assert!((aggregator.balance() - expected_balance(&all)).abs() < 1e-9);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_starts_from_existing_ledger() -> Result<()> {
        let store = setup_test_store().await?;
        let date = at(2024, 7, 1, 10);
        store.insert(new_transaction("Pay", 500.0, true, date)).await?;

        let aggregator = Aggregator::spawn(&store);
        assert_eq!(aggregator.balance(), 500.0);
        assert_eq!(aggregator.subscribe().borrow().total_income, 500.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_subscribers_receive_recomputed_totals() -> Result<()> {
        let store = setup_test_store().await?;
        let aggregator = Aggregator::spawn(&store);
        let mut totals = aggregator.subscribe();
        assert_eq!(*totals.borrow_and_update(), Totals::default());

        store
            .insert(new_transaction("Refund", 25.0, true, at(2024, 7, 2, 9)))
            .await?;
        store
            .insert(new_transaction("Taxi", 10.0, false, at(2024, 7, 2, 9)))
            .await?;

        let latest = *tokio::time::timeout(
            Duration::from_secs(5),
            totals.wait_for(|t| t.total_expense == 10.0),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(latest.total_income, 25.0);
        assert_eq!(latest.balance, 15.0);
        Ok(())
    }

    #[test]
    fn test_totals_of_empty_ledger_are_zero() {
        assert_eq!(Totals::from_transactions(&[]), Totals::default());
    }
}
