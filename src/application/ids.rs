use crate::error::{GatewayError, Result};
use chrono::{Datelike, Utc};
use rand::Rng;
use std::future::Future;
use tracing::debug;

pub const TRANSACTION_PREFIX: &str = "TXN";
pub const VIRTUAL_ACCOUNT_PREFIX: &str = "VA";
pub const RECEIPT_PREFIX: &str = "RCPT";

/// Produces `<PREFIX>-<year>-<6 digits>` identifiers.
///
/// Candidates are random, so uniqueness only comes from checking them against
/// the store. `unique` does that with a bounded number of attempts.
#[derive(Debug, Clone, Copy)]
pub struct IdGenerator {
    max_attempts: u32,
}

impl IdGenerator {
    /// Creates a generator that gives up after `max_attempts` taken candidates.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// The attempt budget shared by every caller of this generator.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// A single, unchecked candidate.
    pub fn generate(&self, prefix: &str) -> String {
        let year = Utc::now().year();
        let random: u32 = rand::thread_rng().gen_range(0..1_000_000);
        format!("{}-{}-{:06}", prefix, year, random)
    }

    /// Generates candidates until `is_taken` reports a free one.
    pub async fn unique<F, Fut>(&self, prefix: &str, mut is_taken: F) -> Result<String>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        for attempt in 1..=self.max_attempts {
            let candidate = self.generate(prefix);
            if !is_taken(candidate.clone()).await? {
                return Ok(candidate);
            }
            debug!(prefix, attempt, candidate = %candidate, "identifier collision, retrying");
        }

        Err(GatewayError::GenerationExhausted {
            prefix: prefix.to_string(),
            attempts: self.max_attempts,
        })
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(20)
    }
}

/// `RCPT-<txnId>`, the receipt stamped on settled tax payments.
pub fn receipt_id(txn_id: &str) -> String {
    format!("{}-{}", RECEIPT_PREFIX, txn_id)
}
