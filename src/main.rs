use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use treasury_gateway::application::{Gateway, Stores};
use treasury_gateway::config::{GatewayConfig, load_config};
use treasury_gateway::domain::ports::SettlementSimulatorRef;
use treasury_gateway::domain::wallet::UserId;
use treasury_gateway::error::GatewayError;
use treasury_gateway::infrastructure::audit::TracingAuditSink;
use treasury_gateway::infrastructure::in_memory::in_memory_stores;
#[cfg(feature = "storage-rocksdb")]
use treasury_gateway::infrastructure::rocksdb::RocksDBStore;
use treasury_gateway::infrastructure::simulator::{
    DeterministicSimulator, RandomSettlementSimulator,
};
use treasury_gateway::interfaces::csv::ledger_writer::LedgerWriter;
use treasury_gateway::interfaces::csv::request_reader::{GatewayRequest, RequestReader};
use treasury_gateway::interfaces::csv::wallet_writer::WalletWriter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input requests CSV file (`op, user, amount, detail`)
    input: PathBuf,

    /// TOML configuration file. Defaults apply to anything it leaves out.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Settle every transaction immediately and successfully.
    #[arg(long)]
    always_succeed: bool,

    /// Also write the transaction ledger as CSV to this path.
    #[arg(long)]
    ledger: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    let simulator: SettlementSimulatorRef = if cli.always_succeed {
        Arc::new(DeterministicSimulator::always_succeed())
    } else {
        Arc::new(RandomSettlementSimulator::new(config.settlement.clone()))
    };

    let stores = open_stores(cli.db_path.as_deref())?;
    let gateway = Arc::new(
        Gateway::start(stores, simulator, Arc::new(TracingAuditSink), &config).await?,
    );

    // Requests for one user run in file order; different users settle concurrently.
    let file = File::open(&cli.input).into_diagnostic()?;
    let mut per_user: HashMap<UserId, Vec<GatewayRequest>> = HashMap::new();
    for request in RequestReader::new(file).requests() {
        match request {
            Ok(request) => per_user
                .entry(request.user_id().clone())
                .or_default()
                .push(request),
            Err(e) => warn!(error = %e, "skipping unreadable request"),
        }
    }

    for user_id in per_user.keys() {
        if gateway.wallets.get_wallet(user_id).await?.is_none() {
            gateway.wallets.create_wallet(user_id).await?;
        }
    }

    let mut tasks = Vec::with_capacity(per_user.len());
    for (user_id, requests) in per_user {
        let gateway = gateway.clone();
        tasks.push(tokio::spawn(async move {
            for request in requests {
                // The gateway has already logged invariant violations under
                // the `reconciliation` target.
                if let Err(e) = handle(&gateway, request).await {
                    if e.is_invariant_violation() {
                        warn!(user = %user_id, error = %e, "request failed, needs reconciliation");
                    } else {
                        warn!(user = %user_id, error = %e, "request rejected");
                    }
                }
            }
        }));
    }
    for task in tasks {
        task.await.into_diagnostic()?;
    }

    let stdout = io::stdout();
    let mut writer = WalletWriter::new(stdout.lock());
    writer.write_wallets(gateway.wallets.all_wallets().await?)?;

    if let Some(path) = &cli.ledger {
        let file = File::create(path).into_diagnostic()?;
        LedgerWriter::new(file).write_transactions(gateway.ledger.all().await?)?;
    }

    let treasury = gateway.treasury.get_stats().await?;
    let overview = gateway.orchestrator.overview().await?;
    info!(
        balance = %treasury.balance,
        total_collected = %treasury.total_collected,
        transactions = overview.transactions.total_transactions,
        success_rate = %overview.transactions.success_rate,
        "treasury"
    );

    Ok(())
}

fn open_stores(db_path: Option<&Path>) -> Result<Stores> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(RocksDBStore::open(path)?.stores()),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            warn!(
                "persistent storage requested via --db-path, but the 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage"
            );
            Ok(in_memory_stores())
        }
        None => Ok(in_memory_stores()),
    }
}

async fn handle(gateway: &Gateway, request: GatewayRequest) -> Result<(), GatewayError> {
    match request {
        GatewayRequest::Payin(r) => {
            gateway.orchestrator.process_payin(r).await?;
        }
        GatewayRequest::Payout(r) => {
            gateway.orchestrator.process_payout(r).await?;
        }
        GatewayRequest::Tax(r) => {
            gateway.orchestrator.process_tax_payment(r).await?;
        }
        GatewayRequest::Suspend(user_id) => {
            gateway.wallets.suspend(&user_id).await?;
        }
        GatewayRequest::Activate(user_id) => {
            gateway.wallets.activate(&user_id).await?;
        }
    }
    Ok(())
}
