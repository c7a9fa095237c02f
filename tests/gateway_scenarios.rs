mod common;

use common::*;
use rust_decimal_macros::dec;
use std::time::Duration;
use treasury_gateway::application::gateway::TAX_FAILURE;
use treasury_gateway::domain::audit::{AuditAction, AuditStatus};
use treasury_gateway::domain::money::Balance;
use treasury_gateway::domain::transaction::{
    META_FAILURE_REASON, META_RECEIPT_ID, TransactionStatus, TransactionType,
};
use treasury_gateway::error::GatewayError;
use treasury_gateway::infrastructure::simulator::DeterministicSimulator;

#[tokio::test(start_paused = true)]
async fn test_payin_on_empty_wallet() {
    let t = start(DeterministicSimulator::new(true, Duration::from_millis(2000))).await;
    let alice = funded_wallet(&t.gateway, "alice", dec!(0)).await;

    let tx = t
        .gateway
        .orchestrator
        .process_payin(payin(&alice, dec!(5000)))
        .await
        .unwrap();

    assert_eq!(tx.status, TransactionStatus::Success);
    assert!(tx.completed_at.is_some());
    let elapsed = tx.processing_time.unwrap();
    assert!((2000..2100).contains(&elapsed), "processing time {}", elapsed);
    assert_eq!(
        wallet_balance(&t.gateway, &alice).await,
        Balance::new(dec!(5000))
    );
}

#[tokio::test]
async fn test_payout_over_balance_rejected_without_record() {
    let t = start(DeterministicSimulator::always_succeed()).await;
    let alice = funded_wallet(&t.gateway, "alice", dec!(100)).await;

    let result = t
        .gateway
        .orchestrator
        .process_payout(payout(&alice, dec!(200)))
        .await;

    assert!(matches!(
        result,
        Err(GatewayError::InsufficientBalance { .. })
    ));
    assert!(t.gateway.ledger.all().await.unwrap().is_empty());
    assert_eq!(
        wallet_balance(&t.gateway, &alice).await,
        Balance::new(dec!(100))
    );
}

#[tokio::test(start_paused = true)]
async fn test_tax_payment_success() {
    let t = start(DeterministicSimulator::new(true, Duration::from_millis(1500))).await;
    let alice = funded_wallet(&t.gateway, "alice", dec!(1000)).await;

    let tx = t
        .gateway
        .orchestrator
        .process_tax_payment(tax(&alice, dec!(300)))
        .await
        .unwrap();

    assert_eq!(tx.status, TransactionStatus::Success);
    assert_eq!(
        wallet_balance(&t.gateway, &alice).await,
        Balance::new(dec!(700))
    );
    assert_eq!(treasury_balance(&t.gateway).await, Balance::new(dec!(300)));
    let expected = format!("RCPT-{}", tx.txn_id);
    assert_eq!(tx.metadata_str(META_RECEIPT_ID), Some(expected.as_str()));

    let recent = t.gateway.ledger.recent_tax_payments(10).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].txn_id, tx.txn_id);
}

#[tokio::test]
async fn test_tax_payment_failure_moves_nothing() {
    let t = start(DeterministicSimulator::always_fail()).await;
    let alice = funded_wallet(&t.gateway, "alice", dec!(1000)).await;

    let tx = t
        .gateway
        .orchestrator
        .process_tax_payment(tax(&alice, dec!(300)))
        .await
        .unwrap();

    assert_eq!(tx.status, TransactionStatus::Failed);
    assert_eq!(tx.metadata_str(META_FAILURE_REASON), Some(TAX_FAILURE));
    assert_eq!(
        wallet_balance(&t.gateway, &alice).await,
        Balance::new(dec!(1000))
    );
    assert_eq!(treasury_balance(&t.gateway).await, Balance::ZERO);

    let audit = t.audit.query(Some(AuditAction::TaxPayment), 10).await;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].status, AuditStatus::Failed);
}

#[tokio::test]
async fn test_status_of_unknown_transaction() {
    let t = start(DeterministicSimulator::always_succeed()).await;

    let result = t
        .gateway
        .orchestrator
        .get_transaction_status("TXN-2026-000000")
        .await;
    assert!(matches!(result, Err(GatewayError::NotFound(_))));

    let verified = t
        .gateway
        .orchestrator
        .verify_transaction("TXN-2026-000000")
        .await;
    assert!(!verified.is_valid);
}

#[tokio::test]
async fn test_history_and_listing() {
    let t = start(DeterministicSimulator::always_succeed()).await;
    let alice = funded_wallet(&t.gateway, "alice", dec!(0)).await;
    let bob = funded_wallet(&t.gateway, "bob", dec!(0)).await;

    for amount in [dec!(10), dec!(20), dec!(30)] {
        t.gateway
            .orchestrator
            .process_payin(payin(&alice, amount))
            .await
            .unwrap();
    }
    t.gateway
        .orchestrator
        .process_payin(payin(&bob, dec!(5)))
        .await
        .unwrap();

    let history = t
        .gateway
        .wallets
        .get_transaction_history(&alice, Some(2))
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|tx| tx.user_id == alice));
    assert!(history[0].created_at >= history[1].created_at);

    let stats = t.gateway.ledger.stats().await.unwrap();
    assert_eq!(stats.total_transactions, 4);
    assert_eq!(stats.by_type[&TransactionType::Payin].count, 4);
    assert_eq!(stats.by_type[&TransactionType::Payin].total_amount, dec!(65));
}

#[tokio::test]
async fn test_suspended_wallet_blocks_requests_until_activated() {
    let t = start(DeterministicSimulator::always_succeed()).await;
    let alice = funded_wallet(&t.gateway, "alice", dec!(50)).await;

    t.gateway.wallets.suspend(&alice).await.unwrap();
    let result = t
        .gateway
        .orchestrator
        .process_tax_payment(tax(&alice, dec!(10)))
        .await;
    assert!(matches!(result, Err(GatewayError::WalletSuspended(_))));
    assert!(t.gateway.ledger.all().await.unwrap().is_empty());

    t.gateway.wallets.activate(&alice).await.unwrap();
    let tx = t
        .gateway
        .orchestrator
        .process_tax_payment(tax(&alice, dec!(10)))
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Success);

    let changes = t
        .audit
        .query(Some(AuditAction::WalletStatusChanged), 10)
        .await;
    assert_eq!(changes.len(), 2);
}
