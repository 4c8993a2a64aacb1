//! Entity module - Contains the SeaORM entity definitions for the database.
//! The ledger persists a single `transactions` table; the entity exposes a Model
//! struct for data and an Entity struct for operations.

pub mod transaction;

pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
