use super::money::{Amount, Balance};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account-type tag identifying the single treasury row.
pub const TREASURY_ACCOUNT_TYPE: &str = "TREASURY_MASTER";

/// The government-side balance accumulating tax receipts.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Treasury {
    pub account_type: String,
    pub balance: Balance,
    /// Lifetime sum of tax receipts; never decreases.
    pub total_collected: Balance,
    pub last_transaction_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Treasury {
    pub fn new() -> Self {
        Self {
            account_type: TREASURY_ACCOUNT_TYPE.to_string(),
            balance: Balance::ZERO,
            total_collected: Balance::ZERO,
            last_transaction_at: None,
            created_at: Utc::now(),
        }
    }

    /// Adds a receipt to the balance and the running total.
    pub fn collect(&mut self, amount: Amount) {
        self.balance.credit(amount);
        self.total_collected.credit(amount);
        self.last_transaction_at = Some(Utc::now());
    }
}

impl Default for Treasury {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_collect_updates_balance_and_total() {
        let mut treasury = Treasury::new();
        assert!(treasury.last_transaction_at.is_none());

        treasury.collect(Amount::new(dec!(300)).unwrap());
        treasury.collect(Amount::new(dec!(200)).unwrap());

        assert_eq!(treasury.balance, Balance::new(dec!(500)));
        assert_eq!(treasury.total_collected, Balance::new(dec!(500)));
        assert!(treasury.last_transaction_at.is_some());
        assert_eq!(treasury.account_type, TREASURY_ACCOUNT_TYPE);
    }
}
