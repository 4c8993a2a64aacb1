//! Core business logic - framework-agnostic ledger, aggregation and sync.

/// Running income, expense and balance derived from ledger snapshots
pub mod aggregator;
/// Display helpers for amounts, dates and totals
pub mod format;
/// Durable, serialized transaction store with change notifications
pub mod ledger;
/// Periodic best-effort cloud sync of unsynced transactions
pub mod sync;
/// Transaction service façade used by presentation code
pub mod transaction;

pub use aggregator::{Aggregator, Totals};
pub use ledger::{LedgerStore, NewTransaction, Snapshot};
pub use sync::{RemoteSync, SimulatedRemote, SyncCoordinator, SyncHandle, SyncPhase, SyncReport};
pub use transaction::TransactionService;
