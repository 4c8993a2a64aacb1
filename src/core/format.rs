//! Display helpers for hosts rendering the ledger.
//!
//! Amounts are stored unsigned; these helpers put the direction back for display and
//! render dates the way transaction lists show them.

use crate::{core::aggregator::Totals, entities::TransactionModel};
use chrono::{DateTime, Utc};

/// `+12.50` for income, `-12.50` for an expense.
#[must_use]
pub fn signed_amount(transaction: &TransactionModel) -> String {
    let sign = if transaction.is_income { '+' } else { '-' };
    format!("{sign}{:.2}", transaction.amount)
}

/// Two-decimal rendering of a total; negative balances keep their sign.
#[must_use]
pub fn money(value: f64) -> String {
    // Avoid printing "-0.00" for balances that cancel out.
    if value.abs() < 0.005 {
        return "0.00".to_string();
    }
    format!("{value:.2}")
}

/// Date as shown in transaction lists, e.g. `05 Mar 2024, 14:30`.
#[must_use]
pub fn display_date(date: DateTime<Utc>) -> String {
    date.format("%d %b %Y, %H:%M").to_string()
}

/// One-line list entry: `05 Mar 2024, 14:30  Coffee [Food]  -3.20`.
#[must_use]
pub fn transaction_line(transaction: &TransactionModel) -> String {
    format!(
        "{}  {} [{}]  {}",
        display_date(transaction.date),
        transaction.title,
        transaction.category,
        signed_amount(transaction)
    )
}

/// `income 100.00 | expense 40.00 | balance 60.00`
#[must_use]
pub fn summary_line(totals: &Totals) -> String {
    format!(
        "income {} | expense {} | balance {}",
        money(totals.total_income),
        money(totals.total_expense),
        money(totals.balance)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::at;

    fn sample(is_income: bool) -> TransactionModel {
        TransactionModel {
            id: 1,
            title: "Coffee".to_string(),
            amount: 3.2,
            is_income,
            category: "Food".to_string(),
            date: at(2024, 3, 5, 14),
            description: None,
            synced_with_cloud: false,
        }
    }

    #[test]
    fn test_signed_amount() {
        assert_eq!(signed_amount(&sample(true)), "+3.20");
        assert_eq!(signed_amount(&sample(false)), "-3.20");
    }

    #[test]
    fn test_money() {
        assert_eq!(money(60.0), "60.00");
        assert_eq!(money(-40.0), "-40.00");
        assert_eq!(money(-0.001), "0.00");
    }

    #[test]
    fn test_transaction_line() {
        assert_eq!(
            transaction_line(&sample(false)),
            "05 Mar 2024, 14:00  Coffee [Food]  -3.20"
        );
    }

    #[test]
    fn test_summary_line() {
        let totals = Totals {
            total_income: 100.0,
            total_expense: 40.0,
            balance: 60.0,
        };
        assert_eq!(
            summary_line(&totals),
            "income 100.00 | expense 40.00 | balance 60.00"
        );
    }
}
