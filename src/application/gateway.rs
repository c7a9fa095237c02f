use super::account_store::AccountStore;
use super::audit::AuditTrail;
use super::ids::receipt_id;
use super::ledger::{TransactionLedger, TransactionStats};
use crate::config::GatewayConfig;
use crate::domain::audit::{AuditEntry, RequestContext};
use crate::domain::money::{Amount, Balance};
use crate::domain::ports::SettlementSimulatorRef;
use crate::domain::transaction::{
    META_ERROR, META_FAILURE_REASON, META_RECEIPT_ID, META_TAX_TYPE, Metadata, NewTransaction,
    Transaction, TransactionStatus, TransactionType,
};
use crate::domain::wallet::UserId;
use crate::error::{GatewayError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, warn};

pub const EXTERNAL_BANK: &str = "EXTERNAL_BANK";
pub const WALLET: &str = "WALLET";
pub const GOVERNMENT_TREASURY: &str = "GOVERNMENT_TREASURY";
pub const DEFAULT_TAX_TYPE: &str = "GENERAL";

pub const PAYIN_FAILURE: &str = "Simulated payment failure";
pub const PAYOUT_FAILURE: &str = "Simulated payout failure";
pub const TAX_FAILURE: &str = "Treasury connection error";
pub const INSUFFICIENT_AT_SETTLEMENT: &str = "Insufficient balance at settlement";
pub const SUSPENDED_AT_SETTLEMENT: &str = "Wallet suspended at settlement";

/// Money entering a wallet from an external rail.
#[derive(Debug, Clone)]
pub struct PayinRequest {
    pub user_id: UserId,
    pub amount: Decimal,
    /// Defaults to `EXTERNAL_BANK`.
    pub from_account: Option<String>,
    pub metadata: Metadata,
    pub context: RequestContext,
}

/// Money leaving a wallet to an external rail.
#[derive(Debug, Clone)]
pub struct PayoutRequest {
    pub user_id: UserId,
    pub amount: Decimal,
    /// Defaults to `EXTERNAL_BANK`.
    pub to_account: Option<String>,
    pub metadata: Metadata,
    pub context: RequestContext,
}

/// Money moving from a wallet into the government treasury.
#[derive(Debug, Clone)]
pub struct TaxPaymentRequest {
    pub user_id: UserId,
    pub amount: Decimal,
    /// Defaults to `GENERAL`.
    pub tax_type: Option<String>,
    pub metadata: Metadata,
    pub context: RequestContext,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub txn_id: String,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TransactionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub r#type: Option<TransactionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemOverview {
    pub transactions: TransactionStats,
    pub total_wallet_balance: Balance,
    pub treasury_balance: Balance,
}

/// A validated request on its way through settlement.
struct Movement {
    draft: NewTransaction,
    audit_metadata: Metadata,
    context: RequestContext,
}

/// What settlement decided for a PENDING row.
enum Settlement {
    Settled(Metadata),
    Rejected(&'static str),
}

/// Coordinates the ledger, the account store and the simulated rail for
/// pay-ins, payouts and tax payments.
///
/// Every operation that gets as far as a PENDING row ends with that row in
/// SUCCESS or FAILED. Cloning is cheap; all collaborators are shared.
#[derive(Clone)]
pub struct GatewayOrchestrator {
    accounts: Arc<AccountStore>,
    ledger: Arc<TransactionLedger>,
    simulator: SettlementSimulatorRef,
    audit: AuditTrail,
    max_amount: Decimal,
}

impl GatewayOrchestrator {
    /// Creates a new `GatewayOrchestrator`.
    ///
    /// # Arguments
    ///
    /// * `accounts` - Balances and their per-account locks.
    /// * `ledger` - Where transactions are recorded.
    /// * `simulator` - The external rail that decides each settlement.
    /// * `audit` - Receives one entry per finished transaction.
    /// * `config` - Supplies the per-request amount cap.
    pub fn new(
        accounts: Arc<AccountStore>,
        ledger: Arc<TransactionLedger>,
        simulator: SettlementSimulatorRef,
        audit: AuditTrail,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            accounts,
            ledger,
            simulator,
            audit,
            max_amount: config.max_amount,
        }
    }

    /// Credits the wallet once the rail settles.
    ///
    /// Returns the finished transaction, SUCCESS or FAILED. Errors mean either
    /// no row was written (validation, unknown or suspended wallet) or the row
    /// could not be finished normally.
    pub async fn process_payin(&self, request: PayinRequest) -> Result<Transaction> {
        let amount = Amount::bounded(request.amount, self.max_amount)?;
        let movement = Movement {
            draft: NewTransaction {
                user_id: request.user_id,
                r#type: TransactionType::Payin,
                amount,
                from_account: request
                    .from_account
                    .unwrap_or_else(|| EXTERNAL_BANK.to_string()),
                to_account: WALLET.to_string(),
                metadata: request.metadata,
            },
            audit_metadata: amount_metadata(amount),
            context: request.context,
        };
        self.execute(movement).await
    }

    /// Debits the wallet once the rail settles.
    ///
    /// Fails with `InsufficientBalance`, without writing a row, when the
    /// balance cannot cover the amount at request time.
    pub async fn process_payout(&self, request: PayoutRequest) -> Result<Transaction> {
        let amount = Amount::bounded(request.amount, self.max_amount)?;
        let movement = Movement {
            draft: NewTransaction {
                user_id: request.user_id,
                r#type: TransactionType::Payout,
                amount,
                from_account: WALLET.to_string(),
                to_account: request
                    .to_account
                    .unwrap_or_else(|| EXTERNAL_BANK.to_string()),
                metadata: request.metadata,
            },
            audit_metadata: amount_metadata(amount),
            context: request.context,
        };
        self.execute(movement).await
    }

    /// Moves funds from the wallet to the treasury and stamps a `receiptId`.
    ///
    /// `tax_type` defaults to `GENERAL`. Balance checks match `process_payout`.
    pub async fn process_tax_payment(&self, request: TaxPaymentRequest) -> Result<Transaction> {
        let amount = Amount::bounded(request.amount, self.max_amount)?;
        let tax_type = request
            .tax_type
            .unwrap_or_else(|| DEFAULT_TAX_TYPE.to_string());

        let mut metadata = Metadata::new();
        metadata.insert(META_TAX_TYPE.to_string(), Value::String(tax_type.clone()));
        metadata.extend(request.metadata);

        let mut audit_metadata = amount_metadata(amount);
        audit_metadata.insert(META_TAX_TYPE.to_string(), Value::String(tax_type));

        let movement = Movement {
            draft: NewTransaction {
                user_id: request.user_id,
                r#type: TransactionType::Tax,
                amount,
                from_account: WALLET.to_string(),
                to_account: GOVERNMENT_TREASURY.to_string(),
                metadata,
            },
            audit_metadata,
            context: request.context,
        };
        self.execute(movement).await
    }

    /// Exact lookup; `NotFound` for an unknown id.
    pub async fn get_transaction_status(&self, txn_id: &str) -> Result<Transaction> {
        self.ledger.get(txn_id).await
    }

    /// Never fails; lookup problems come back as `is_valid: false`.
    pub async fn verify_transaction(&self, txn_id: &str) -> VerificationResult {
        match self.ledger.get(txn_id).await {
            Ok(tx) => VerificationResult {
                txn_id: tx.txn_id,
                is_valid: true,
                status: Some(tx.status),
                amount: Some(tx.amount),
                r#type: Some(tx.r#type),
                timestamp: Some(tx.created_at),
                error: None,
            },
            Err(e) => VerificationResult {
                txn_id: txn_id.to_string(),
                is_valid: false,
                status: None,
                amount: None,
                r#type: None,
                timestamp: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Ledger statistics together with the wallet and treasury totals.
    pub async fn overview(&self) -> Result<SystemOverview> {
        let transactions = self.ledger.stats().await?;
        let total_wallet_balance = self
            .accounts
            .all_wallets()
            .await?
            .into_iter()
            .map(|w| w.balance)
            .sum();
        let treasury_balance = self
            .accounts
            .treasury()
            .await?
            .map(|t| t.balance)
            .unwrap_or_default();

        Ok(SystemOverview {
            transactions,
            total_wallet_balance,
            treasury_balance,
        })
    }

    async fn execute(&self, movement: Movement) -> Result<Transaction> {
        self.begin(movement).await.inspect_err(|e| {
            if e.is_invariant_violation() {
                error!(target: "reconciliation", error = %e, "invariant violation while processing transaction");
            }
        })
    }

    /// Everything up to the PENDING insert, then hands off to settlement.
    async fn begin(&self, movement: Movement) -> Result<Transaction> {
        let user_id = &movement.draft.user_id;
        let amount = movement.draft.amount;

        let wallet = self.accounts.wallet(user_id).await?;
        wallet.ensure_active()?;

        let txn_id = self.ledger.next_transaction_id().await?;

        if movement.draft.r#type.debits_wallet() && !wallet.balance.covers(amount) {
            return Err(GatewayError::InsufficientBalance {
                available: wallet.balance,
                requested: amount.into(),
            });
        }

        let started = Instant::now();
        let pending = self
            .ledger
            .create_pending(txn_id, movement.draft.clone())
            .await?;

        // Settlement owns its own task so a caller that goes away cannot
        // strand the row in PENDING.
        let this = self.clone();
        tokio::spawn(async move { this.settle(pending, movement, started).await })
            .await
            .map_err(|e| GatewayError::Internal(format!("settlement task failed: {}", e)))?
    }

    async fn settle(
        &self,
        mut tx: Transaction,
        movement: Movement,
        started: Instant,
    ) -> Result<Transaction> {
        let outcome = self.simulator.run(tx.r#type).await;
        tokio::time::sleep(outcome.delay).await;

        let settlement = if outcome.success {
            match self.apply(&tx).await {
                Ok(extra) => Settlement::Settled(extra),
                Err(GatewayError::InsufficientBalance { .. }) => {
                    Settlement::Rejected(INSUFFICIENT_AT_SETTLEMENT)
                }
                Err(GatewayError::WalletSuspended(_)) => Settlement::Rejected(SUSPENDED_AT_SETTLEMENT),
                Err(e) => return Err(self.abort(tx, &movement, started, e).await),
            }
        } else {
            Settlement::Rejected(failure_reason(tx.r#type))
        };

        let applied = matches!(settlement, Settlement::Settled(_));
        let transition = match settlement {
            Settlement::Settled(extra) => tx.succeed(extra),
            Settlement::Rejected(reason) => tx.fail(META_FAILURE_REASON, reason),
        };
        if let Err(e) = transition {
            return Err(self.abort(tx, &movement, started, e).await);
        }
        tx.processing_time = Some(elapsed_ms(started));

        if let Err(e) = self.ledger.finalize(&tx).await {
            let reason = if applied {
                format!("balances settled but the SUCCESS write failed: {}", e)
            } else {
                format!("marking the transaction FAILED failed: {}", e)
            };
            error!(
                target: "reconciliation",
                txn_id = %tx.txn_id,
                kind = %tx.r#type,
                amount = %tx.amount,
                reason = %reason,
                "transaction left PENDING"
            );
            return Err(GatewayError::LedgerInconsistency {
                reference: tx.txn_id.clone(),
                reason,
            });
        }

        info!(
            txn_id = %tx.txn_id,
            kind = %tx.r#type,
            status = %tx.status,
            amount = %tx.amount,
            processing_time_ms = tx.processing_time.unwrap_or_default(),
            "transaction settled"
        );
        self.record(&tx, &movement).await;
        Ok(tx)
    }

    /// Balance effects of a successful settlement, plus any metadata they produce.
    async fn apply(&self, tx: &Transaction) -> Result<Metadata> {
        let mut extra = Metadata::new();
        match tx.r#type {
            TransactionType::Payin => {
                self.accounts.credit(&tx.user_id, tx.amount).await?;
            }
            TransactionType::Payout => {
                self.accounts.debit(&tx.user_id, tx.amount).await?;
            }
            TransactionType::Tax => {
                self.accounts
                    .transfer_to_treasury(&tx.user_id, tx.amount)
                    .await?;
                extra.insert(
                    META_RECEIPT_ID.to_string(),
                    Value::String(receipt_id(&tx.txn_id)),
                );
            }
        }
        Ok(extra)
    }

    /// Marks a still-PENDING row FAILED after an unexpected error and hands
    /// back the error for the caller.
    async fn abort(
        &self,
        mut tx: Transaction,
        movement: &Movement,
        started: Instant,
        cause: GatewayError,
    ) -> GatewayError {
        warn!(txn_id = %tx.txn_id, error = %cause, "settlement aborted, marking transaction FAILED");

        if tx.is_terminal() {
            return cause;
        }
        if let Err(e) = tx.fail(META_ERROR, cause.to_string()) {
            return e;
        }
        tx.processing_time = Some(elapsed_ms(started));

        match self.ledger.finalize(&tx).await {
            Ok(()) => {
                self.record(&tx, movement).await;
                cause
            }
            Err(write_error) => {
                error!(
                    target: "reconciliation",
                    txn_id = %tx.txn_id,
                    cause = %cause,
                    write_error = %write_error,
                    "could not mark transaction FAILED"
                );
                GatewayError::LedgerInconsistency {
                    reference: tx.txn_id.clone(),
                    reason: format!("{}; marking FAILED also failed: {}", cause, write_error),
                }
            }
        }
    }

    async fn record(&self, tx: &Transaction, movement: &Movement) {
        self.audit
            .log(
                AuditEntry::new(tx.r#type.into(), tx.status.into())
                    .user(tx.user_id.clone())
                    .resource(tx.txn_id.clone())
                    .context(&movement.context)
                    .metadata(movement.audit_metadata.clone()),
            )
            .await;
    }
}

fn failure_reason(kind: TransactionType) -> &'static str {
    match kind {
        TransactionType::Payin => PAYIN_FAILURE,
        TransactionType::Payout => PAYOUT_FAILURE,
        TransactionType::Tax => TAX_FAILURE,
    }
}

fn amount_metadata(amount: Amount) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("amount".to_string(), json!(amount.value()));
    metadata
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
