use sea_orm::DbErr;
use std::fmt;
use thiserror::Error;

/// A single rejected input field and the rule it broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Violation {
    /// Name of the offending field (`"title"`, `"amount"`, ...)
    pub field: &'static str,
    /// Human readable rule that was broken
    pub reason: &'static str,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.reason)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every failure the ledger, its configuration and the sync coordinator can report.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid transaction: {}", join_violations(.violations))]
    Validation { violations: Vec<Violation> },

    #[error("Transaction {id} not found")]
    NotFound { id: i64 },

    #[error("Failed to sync transaction {id}: {message}")]
    Sync { id: i64, message: String },

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Field names rejected by a `Validation` error, empty for every other kind.
    #[must_use]
    pub fn invalid_fields(&self) -> Vec<&'static str> {
        match self {
            Self::Validation { violations } => violations.iter().map(|v| v.field).collect(),
            _ => Vec::new(),
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_every_field() {
        let err = Error::Validation {
            violations: vec![
                Violation {
                    field: "title",
                    reason: "must not be empty",
                },
                Violation {
                    field: "amount",
                    reason: "must be greater than zero",
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Invalid transaction: title must not be empty, amount must be greater than zero"
        );
        assert_eq!(err.invalid_fields(), vec!["title", "amount"]);
    }

    #[test]
    fn test_invalid_fields_empty_for_other_errors() {
        assert!(Error::NotFound { id: 7 }.invalid_fields().is_empty());
        assert_eq!(Error::NotFound { id: 7 }.to_string(), "Transaction 7 not found");
    }
}
