use crate::domain::wallet::{Wallet, WalletStatus};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct WalletRow<'a> {
    user: &'a str,
    virtual_account: &'a str,
    balance: Decimal,
    status: WalletStatus,
}

/// Writes the final wallet balances as CSV, one row per wallet ordered by user.
pub struct WalletWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> WalletWriter<W> {
    /// Creates a new `WalletWriter`.
    ///
    /// # Arguments
    ///
    /// * `sink` - Where the CSV is written, usually stdout.
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes a header and one row per wallet, sorted by user, then flushes.
    pub fn write_wallets(&mut self, mut wallets: Vec<Wallet>) -> Result<()> {
        wallets.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        for wallet in &wallets {
            self.writer.serialize(WalletRow {
                user: wallet.user_id.as_str(),
                virtual_account: &wallet.virtual_account_no,
                balance: wallet.balance.value().normalize(),
                status: wallet.status,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
