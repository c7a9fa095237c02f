#![allow(dead_code)]

use rust_decimal::Decimal;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use treasury_gateway::application::Gateway;
use treasury_gateway::application::gateway::{PayinRequest, PayoutRequest, TaxPaymentRequest};
use treasury_gateway::config::GatewayConfig;
use treasury_gateway::domain::audit::RequestContext;
use treasury_gateway::domain::money::{Amount, Balance};
use treasury_gateway::domain::transaction::Metadata;
use treasury_gateway::domain::wallet::UserId;
use treasury_gateway::infrastructure::audit::InMemoryAuditLog;
use treasury_gateway::infrastructure::in_memory::in_memory_stores;
use treasury_gateway::infrastructure::simulator::DeterministicSimulator;

pub struct TestGateway {
    pub gateway: Arc<Gateway>,
    pub audit: Arc<InMemoryAuditLog>,
}

/// An in-memory gateway with an initialized treasury.
pub async fn start(simulator: DeterministicSimulator) -> TestGateway {
    let audit = Arc::new(InMemoryAuditLog::new());
    let gateway = Gateway::start(
        in_memory_stores(),
        Arc::new(simulator),
        audit.clone(),
        &GatewayConfig::default(),
    )
    .await
    .unwrap();
    TestGateway {
        gateway: Arc::new(gateway),
        audit,
    }
}

/// Opens a wallet for `user` and seeds it with `balance` outside the ledger.
pub async fn funded_wallet(gateway: &Gateway, user: &str, balance: Decimal) -> UserId {
    let user_id = UserId::new(user);
    gateway.wallets.create_wallet(&user_id).await.unwrap();
    if balance > Decimal::ZERO {
        gateway
            .accounts
            .credit(&user_id, Amount::new(balance).unwrap())
            .await
            .unwrap();
    }
    user_id
}

pub async fn wallet_balance(gateway: &Gateway, user_id: &UserId) -> Balance {
    gateway.accounts.wallet(user_id).await.unwrap().balance
}

pub async fn treasury_balance(gateway: &Gateway) -> Balance {
    gateway.treasury.get_stats().await.unwrap().balance
}

/// Sum of every wallet plus the treasury.
pub async fn total_funds(gateway: &Gateway) -> Balance {
    let wallets: Balance = gateway
        .wallets
        .all_wallets()
        .await
        .unwrap()
        .into_iter()
        .map(|w| w.balance)
        .sum();
    wallets + treasury_balance(gateway).await
}

pub fn payin(user_id: &UserId, amount: Decimal) -> PayinRequest {
    PayinRequest {
        user_id: user_id.clone(),
        amount,
        from_account: None,
        metadata: Metadata::new(),
        context: RequestContext::default(),
    }
}

pub fn payout(user_id: &UserId, amount: Decimal) -> PayoutRequest {
    PayoutRequest {
        user_id: user_id.clone(),
        amount,
        to_account: None,
        metadata: Metadata::new(),
        context: RequestContext::default(),
    }
}

pub fn tax(user_id: &UserId, amount: Decimal) -> TaxPaymentRequest {
    TaxPaymentRequest {
        user_id: user_id.clone(),
        amount,
        tax_type: None,
        metadata: Metadata::new(),
        context: RequestContext::default(),
    }
}

/// Writes a requests CSV with the standard header.
pub fn requests_csv(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "op, user, amount, detail").unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file
}
