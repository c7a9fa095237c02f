use super::ids::{IdGenerator, TRANSACTION_PREFIX};
use crate::domain::ports::TransactionRepositoryRef;
use crate::domain::transaction::{NewTransaction, Transaction, TransactionStatus, TransactionType};
use crate::domain::wallet::UserId;
use crate::error::{GatewayError, Result};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::warn;

/// Narrows a ledger listing. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub r#type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub user_id: Option<UserId>,
}

impl TransactionFilter {
    fn matches(&self, tx: &Transaction) -> bool {
        self.r#type.is_none_or(|t| t == tx.r#type)
            && self.status.is_none_or(|s| s == tx.status)
            && self.user_id.as_ref().is_none_or(|u| *u == tx.user_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionPage {
    pub items: Vec<Transaction>,
    /// Rows matching the filter across all pages.
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TypeStats {
    pub count: u64,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionStats {
    pub total_transactions: u64,
    pub by_type: HashMap<TransactionType, TypeStats>,
    /// Percentage of rows in SUCCESS, rounded to two decimals.
    pub success_rate: Decimal,
}

/// Append-only record of every attempted money movement.
pub struct TransactionLedger {
    repo: TransactionRepositoryRef,
    ids: IdGenerator,
}

impl TransactionLedger {
    /// Creates a new `TransactionLedger`.
    ///
    /// # Arguments
    ///
    /// * `repo` - The transaction repository port.
    /// * `ids` - Generator for `TXN-` identifiers.
    pub fn new(repo: TransactionRepositoryRef, ids: IdGenerator) -> Self {
        Self { repo, ids }
    }

    /// A `TXN-` identifier that no stored row uses yet.
    pub async fn next_transaction_id(&self) -> Result<String> {
        let repo = &self.repo;
        self.ids
            .unique(TRANSACTION_PREFIX, |candidate| async move {
                repo.exists(&candidate).await
            })
            .await
    }

    /// Inserts the PENDING row under `txn_id`.
    ///
    /// Another request can claim the same id between generation and insert;
    /// the repository rejects the second insert and a fresh id is drawn.
    pub async fn create_pending(&self, txn_id: String, draft: NewTransaction) -> Result<Transaction> {
        let mut txn_id = txn_id;
        for _ in 0..self.ids.max_attempts() {
            let tx = Transaction::pending(txn_id.clone(), draft.clone());
            match self.repo.insert(tx.clone()).await {
                Ok(()) => return Ok(tx),
                Err(GatewayError::DuplicateTransaction(taken)) => {
                    warn!(txn_id = %taken, "transaction id claimed concurrently, regenerating");
                    txn_id = self.next_transaction_id().await?;
                }
                Err(e) => return Err(e),
            }
        }

        Err(GatewayError::GenerationExhausted {
            prefix: TRANSACTION_PREFIX.to_string(),
            attempts: self.ids.max_attempts(),
        })
    }

    /// Persists a terminal transaction over its PENDING row.
    pub async fn finalize(&self, tx: &Transaction) -> Result<()> {
        if !tx.is_terminal() {
            return Err(GatewayError::Internal(format!(
                "refusing to finalize {} while still {}",
                tx.txn_id, tx.status
            )));
        }
        let stored = self.get(&tx.txn_id).await?;
        if stored.is_terminal() {
            return Err(GatewayError::InvalidTransition {
                txn_id: stored.txn_id,
                status: stored.status.to_string(),
            });
        }
        self.repo.update(tx.clone()).await
    }

    /// Looks up a row by id; `None` if it was never written.
    pub async fn find(&self, txn_id: &str) -> Result<Option<Transaction>> {
        self.repo.get(txn_id).await
    }

    /// Like `find`, but a missing row is `NotFound`.
    pub async fn get(&self, txn_id: &str) -> Result<Transaction> {
        self.repo
            .get(txn_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(txn_id.to_string()))
    }

    /// Every row in storage order.
    pub async fn all(&self) -> Result<Vec<Transaction>> {
        self.repo.get_all().await
    }

    /// A user's transactions, newest first.
    pub async fn history(&self, user_id: &UserId, limit: usize) -> Result<Vec<Transaction>> {
        let filter = TransactionFilter {
            user_id: Some(user_id.clone()),
            ..Default::default()
        };
        Ok(self.list(&filter, 1, limit).await?.items)
    }

    /// Newest-first listing; `page` starts at 1.
    pub async fn list(
        &self,
        filter: &TransactionFilter,
        page: usize,
        limit: usize,
    ) -> Result<TransactionPage> {
        let mut matching: Vec<Transaction> = self
            .repo
            .get_all()
            .await?
            .into_iter()
            .filter(|tx| filter.matches(tx))
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.txn_id.cmp(&a.txn_id))
        });

        let page = page.max(1);
        let total = matching.len();
        let items = matching
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();

        Ok(TransactionPage {
            items,
            total,
            page,
            limit,
        })
    }

    /// Newest tax payments first, at most `limit`.
    pub async fn recent_tax_payments(&self, limit: usize) -> Result<Vec<Transaction>> {
        let filter = TransactionFilter {
            r#type: Some(TransactionType::Tax),
            ..Default::default()
        };
        Ok(self.list(&filter, 1, limit).await?.items)
    }

    /// Counts and totals per type, plus the overall success rate.
    pub async fn stats(&self) -> Result<TransactionStats> {
        let transactions = self.repo.get_all().await?;
        let mut stats = TransactionStats {
            total_transactions: transactions.len() as u64,
            ..Default::default()
        };

        let mut succeeded = 0u64;
        for tx in &transactions {
            let entry = stats.by_type.entry(tx.r#type).or_default();
            entry.count += 1;
            entry.total_amount += tx.amount.value();
            if tx.status == TransactionStatus::Success {
                succeeded += 1;
            }
        }

        if stats.total_transactions > 0 {
            stats.success_rate = (Decimal::from(succeeded) * Decimal::ONE_HUNDRED
                / Decimal::from(stats.total_transactions))
            .round_dp(2);
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Amount;
    use crate::domain::ports::TransactionRepository;
    use crate::domain::transaction::{META_FAILURE_REASON, Metadata};
    use crate::infrastructure::in_memory::InMemoryTransactionRepository;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn ledger() -> TransactionLedger {
        TransactionLedger::new(
            Arc::new(InMemoryTransactionRepository::new()),
            IdGenerator::default(),
        )
    }

    fn draft(user: &str, kind: TransactionType, amount: Decimal) -> NewTransaction {
        NewTransaction {
            user_id: UserId::new(user),
            r#type: kind,
            amount: Amount::new(amount).unwrap(),
            from_account: "WALLET".to_string(),
            to_account: "EXTERNAL_BANK".to_string(),
            metadata: Metadata::new(),
        }
    }

    async fn open(ledger: &TransactionLedger, d: NewTransaction) -> Transaction {
        let id = ledger.next_transaction_id().await.unwrap();
        ledger.create_pending(id, d).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_pending_then_finalize() {
        let ledger = ledger();
        let mut tx = open(&ledger, draft("alice", TransactionType::Payout, dec!(50))).await;
        assert_eq!(ledger.get(&tx.txn_id).await.unwrap().status, TransactionStatus::Pending);

        tx.fail(META_FAILURE_REASON, "Simulated payout failure").unwrap();
        ledger.finalize(&tx).await.unwrap();

        let stored = ledger.get(&tx.txn_id).await.unwrap();
        assert_eq!(stored.status, TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn test_finalize_refuses_second_terminal_write() {
        let ledger = ledger();
        let tx = open(&ledger, draft("alice", TransactionType::Payin, dec!(50))).await;

        let mut first = tx.clone();
        first.succeed(Metadata::new()).unwrap();
        ledger.finalize(&first).await.unwrap();

        let mut second = tx.clone();
        second.fail(META_FAILURE_REASON, "late").unwrap();
        let result = ledger.finalize(&second).await;
        assert!(matches!(result, Err(GatewayError::InvalidTransition { .. })));
        assert_eq!(
            ledger.get(&tx.txn_id).await.unwrap().status,
            TransactionStatus::Success
        );
    }

    #[tokio::test]
    async fn test_finalize_rejects_pending() {
        let ledger = ledger();
        let tx = open(&ledger, draft("alice", TransactionType::Payin, dec!(50))).await;
        assert!(matches!(
            ledger.finalize(&tx).await,
            Err(GatewayError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn test_create_pending_regenerates_taken_id() {
        let repo = Arc::new(InMemoryTransactionRepository::new());
        let ledger = TransactionLedger::new(repo.clone(), IdGenerator::default());
        let first = open(&ledger, draft("alice", TransactionType::Payin, dec!(1))).await;

        let second = ledger
            .create_pending(first.txn_id.clone(), draft("bob", TransactionType::Payin, dec!(2)))
            .await
            .unwrap();

        assert_ne!(second.txn_id, first.txn_id);
        assert_eq!(repo.get_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let ledger = ledger();
        assert!(matches!(
            ledger.get("TXN-2026-000000").await,
            Err(GatewayError::NotFound(_))
        ));
        assert!(ledger.find("TXN-2026-000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_bounded() {
        let ledger = ledger();
        let mut opened = Vec::new();
        for _ in 0..3 {
            opened.push(open(&ledger, draft("alice", TransactionType::Payin, dec!(10))).await);
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        open(&ledger, draft("bob", TransactionType::Payin, dec!(10))).await;

        let history = ledger.history(&UserId::new("alice"), 2).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].txn_id, opened[2].txn_id);
        assert_eq!(history[1].txn_id, opened[1].txn_id);
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let ledger = ledger();
        for _ in 0..3 {
            open(&ledger, draft("alice", TransactionType::Tax, dec!(5))).await;
        }
        open(&ledger, draft("alice", TransactionType::Payin, dec!(5))).await;

        let filter = TransactionFilter {
            r#type: Some(TransactionType::Tax),
            ..Default::default()
        };
        let page = ledger.list(&filter, 2, 2).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(ledger.recent_tax_payments(10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_stats() {
        let ledger = ledger();
        let mut tx = open(&ledger, draft("alice", TransactionType::Payin, dec!(100))).await;
        tx.succeed(Metadata::new()).unwrap();
        ledger.finalize(&tx).await.unwrap();
        open(&ledger, draft("alice", TransactionType::Payin, dec!(50))).await;
        open(&ledger, draft("alice", TransactionType::Tax, dec!(25))).await;

        let stats = ledger.stats().await.unwrap();
        assert_eq!(stats.total_transactions, 3);
        assert_eq!(stats.by_type[&TransactionType::Payin].count, 2);
        assert_eq!(stats.by_type[&TransactionType::Payin].total_amount, dec!(150));
        assert_eq!(stats.success_rate, dec!(33.33));
    }
}
