use crate::domain::transaction::{
    META_ERROR, META_FAILURE_REASON, META_RECEIPT_ID, Transaction, TransactionStatus,
    TransactionType,
};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct LedgerRow<'a> {
    txn_id: &'a str,
    user: &'a str,
    r#type: TransactionType,
    amount: Decimal,
    status: TransactionStatus,
    from_account: &'a str,
    to_account: &'a str,
    processing_time_ms: Option<u64>,
    receipt_id: Option<&'a str>,
    reason: Option<&'a str>,
}

/// Writes the transaction ledger as CSV in creation order.
pub struct LedgerWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> LedgerWriter<W> {
    /// Creates a new `LedgerWriter`.
    ///
    /// # Arguments
    ///
    /// * `sink` - Where the CSV is written.
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes a header and one row per transaction, oldest first, then flushes.
    pub fn write_transactions(&mut self, mut transactions: Vec<Transaction>) -> Result<()> {
        transactions.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.txn_id.cmp(&b.txn_id))
        });
        for tx in &transactions {
            self.writer.serialize(LedgerRow {
                txn_id: &tx.txn_id,
                user: tx.user_id.as_str(),
                r#type: tx.r#type,
                amount: tx.amount.value().normalize(),
                status: tx.status,
                from_account: &tx.from_account,
                to_account: &tx.to_account,
                processing_time_ms: tx.processing_time,
                receipt_id: tx.metadata_str(META_RECEIPT_ID),
                reason: tx
                    .metadata_str(META_FAILURE_REASON)
                    .or_else(|| tx.metadata_str(META_ERROR)),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
