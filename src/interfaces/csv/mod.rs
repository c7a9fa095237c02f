//! Batch driver I/O: gateway requests in, wallet and ledger reports out.

pub mod ledger_writer;
pub mod request_reader;
pub mod wallet_writer;
