//! Application layer: the services that enforce ledger and balance rules on
//! top of the repository ports.
//!
//! `Gateway` wires every service against one set of stores. Wallet and
//! treasury balances are only ever mutated through `AccountStore`, which
//! serializes writers per account.

pub mod account_store;
pub mod audit;
pub mod gateway;
pub mod ids;
pub mod ledger;
pub mod treasury;
pub mod wallet;

use crate::config::GatewayConfig;
use crate::domain::ports::{
    AuditSinkRef, SettlementSimulatorRef, TransactionRepositoryRef, TreasuryRepositoryRef,
    WalletRepositoryRef,
};
use crate::error::Result;
use account_store::AccountStore;
use audit::AuditTrail;
use gateway::GatewayOrchestrator;
use ids::IdGenerator;
use ledger::TransactionLedger;
use std::sync::Arc;
use treasury::TreasuryService;
use wallet::WalletService;

/// The three persistence ports a gateway runs against.
#[derive(Clone)]
pub struct Stores {
    pub wallets: WalletRepositoryRef,
    pub treasury: TreasuryRepositoryRef,
    pub transactions: TransactionRepositoryRef,
}

pub struct Gateway {
    pub orchestrator: GatewayOrchestrator,
    pub wallets: WalletService,
    pub treasury: TreasuryService,
    pub ledger: Arc<TransactionLedger>,
    pub accounts: Arc<AccountStore>,
}

impl Gateway {
    pub fn new(
        stores: Stores,
        simulator: SettlementSimulatorRef,
        audit_sink: AuditSinkRef,
        config: &GatewayConfig,
    ) -> Self {
        let ids = IdGenerator::new(config.id_max_attempts);
        let audit = AuditTrail::new(audit_sink, config.audit_timeout());
        let accounts = Arc::new(AccountStore::new(stores.wallets, stores.treasury));
        let ledger = Arc::new(TransactionLedger::new(stores.transactions, ids));

        Self {
            orchestrator: GatewayOrchestrator::new(
                accounts.clone(),
                ledger.clone(),
                simulator,
                audit.clone(),
                config,
            ),
            wallets: WalletService::new(
                accounts.clone(),
                ledger.clone(),
                ids,
                audit.clone(),
                config.history_limit,
            ),
            treasury: TreasuryService::new(accounts.clone(), audit),
            ledger,
            accounts,
        }
    }

    /// Builds the gateway and runs the startup steps, currently just
    /// treasury initialization.
    pub async fn start(
        stores: Stores,
        simulator: SettlementSimulatorRef,
        audit_sink: AuditSinkRef,
        config: &GatewayConfig,
    ) -> Result<Self> {
        let gateway = Self::new(stores, simulator, audit_sink, config);
        gateway.treasury.initialize_treasury().await?;
        Ok(gateway)
    }
}
