use crate::domain::money::Balance;
use crate::domain::wallet::UserId;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum GatewayError {
    #[error("Validation error: {0}")]
    #[diagnostic(code(gateway::validation))]
    Validation(String),

    #[error("Insufficient balance: available {available}, requested {requested}")]
    #[diagnostic(code(gateway::insufficient_balance))]
    InsufficientBalance { available: Balance, requested: Balance },

    #[error("Wallet not found for user {0}")]
    #[diagnostic(code(gateway::wallet_not_found))]
    WalletNotFound(UserId),

    #[error("Wallet already exists for user {0}")]
    #[diagnostic(code(gateway::wallet_exists))]
    WalletAlreadyExists(UserId),

    #[error("Wallet for user {0} is suspended")]
    #[diagnostic(code(gateway::wallet_suspended))]
    WalletSuspended(UserId),

    #[error("Transaction {0} not found")]
    #[diagnostic(code(gateway::not_found))]
    NotFound(String),

    #[error("Virtual account {0} is already assigned")]
    #[diagnostic(code(gateway::duplicate_virtual_account))]
    DuplicateVirtualAccount(String),

    #[error("Transaction {0} already exists")]
    #[diagnostic(code(gateway::duplicate_transaction))]
    DuplicateTransaction(String),

    #[error("Transaction {txn_id} is already {status} and cannot change state")]
    #[diagnostic(code(gateway::invalid_transition))]
    InvalidTransition { txn_id: String, status: String },

    #[error("Treasury not initialized")]
    #[diagnostic(
        code(gateway::treasury_not_initialized),
        help("the treasury must be initialized at process startup")
    )]
    TreasuryNotInitialized,

    #[error("Could not generate a unique {prefix} identifier after {attempts} attempts")]
    #[diagnostic(code(gateway::generation_exhausted))]
    GenerationExhausted { prefix: String, attempts: u32 },

    #[error("Storage error: {0}")]
    #[diagnostic(code(gateway::storage))]
    Storage(String),

    #[error("Ledger inconsistency on {reference}: {reason}")]
    #[diagnostic(
        code(gateway::ledger_inconsistency),
        help("balances and ledger need out-of-band reconciliation")
    )]
    LedgerInconsistency { reference: String, reason: String },

    #[error("Configuration error: {0}")]
    #[diagnostic(code(gateway::config))]
    Config(String),

    #[error("CSV error: {0}")]
    #[diagnostic(code(gateway::csv))]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(gateway::io))]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(gateway::internal))]
    Internal(String),
}

impl GatewayError {
    /// Errors that point at systemic misconfiguration or a broken ledger
    /// rather than at a single failed transaction.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            GatewayError::TreasuryNotInitialized
                | GatewayError::GenerationExhausted { .. }
                | GatewayError::LedgerInconsistency { .. }
        )
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for GatewayError {
    fn from(e: rocksdb::Error) -> Self {
        GatewayError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Storage(format!("Serialization error: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
