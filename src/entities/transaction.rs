//! Transaction entity - Represents every income or expense record in the ledger.
//!
//! Each transaction has a title, a positive `amount`, an `is_income` flag carrying the
//! direction, a free-text category, the `date` it is attributed to, an optional description
//! and the `synced_with_cloud` flag maintained by the sync coordinator.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier, assigned on insert and never reused
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Short label shown in transaction lists
    pub title: String,
    /// Magnitude of the transaction, always positive
    pub amount: f64,
    /// `true` for income, `false` for an expense
    pub is_income: bool,
    /// Free-text category label
    pub category: String,
    /// Point in time the transaction is attributed to (user chosen)
    pub date: DateTimeUtc,
    /// Optional free-text notes
    pub description: Option<String>,
    /// Set once the record has been written to the remote store
    pub synced_with_cloud: bool,
}

impl Model {
    /// Amount with the direction applied: positive for income, negative for expenses.
    #[must_use]
    pub fn signed_amount(&self) -> f64 {
        if self.is_income {
            self.amount
        } else {
            -self.amount
        }
    }
}

/// Transactions live in a single table with no relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
