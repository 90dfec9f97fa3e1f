use std::sync::Arc;
use tracing::{info, warn};
use yield_tracker::blockchain::{CallPolicy, EthereumClient, GuardedLedger};
use yield_tracker::config::Settings;
use yield_tracker::services::fixtures::LOCAL_TEST_WALLET;
use yield_tracker::utils::init_logging;
use yield_tracker::{AppError, YieldTracker};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let settings = Settings::new()?;
    init_logging(&settings.logging);
    info!(rpc_url = %settings.rpc.url, "Starting yield tracker");

    let client = EthereumClient::new(&settings.rpc.url)?;
    match client.test_connection().await {
        Ok(block) => info!(block, "Connected to RPC endpoint"),
        Err(e) => warn!(error = %e, "RPC endpoint unreachable, continuing with degraded data"),
    }

    let ledger = GuardedLedger::new(Arc::new(client), CallPolicy::from(&settings.rpc));
    let tracker = YieldTracker::new(Arc::new(ledger), &settings);

    let mut wallets = Vec::new();
    for arg in std::env::args().skip(1) {
        let wallet = EthereumClient::validate_address(&arg)
            .map_err(|_| AppError::InvalidAddress(arg.clone()))?;
        wallets.push(wallet);
    }
    if wallets.is_empty() {
        wallets.push(LOCAL_TEST_WALLET);
    }

    let output = if let [wallet] = wallets.as_slice() {
        let data = tracker.get_wallet_data(*wallet).await;
        info!(
            wallet = %wallet,
            value = %tracker.format_portfolio_value(data.summary.total_value),
            apy = %tracker.format_apy(data.summary.weighted_apy),
            accrued = %tracker.format_accrued(data.summary.total_accrued),
            "Portfolio loaded"
        );
        serde_json::to_string_pretty(&data)?
    } else {
        let data = tracker.get_multi_wallet_data(&wallets).await;
        info!(
            wallet_count = data.wallets.len(),
            value = %tracker.format_portfolio_value(data.aggregated.total_value),
            "Portfolios loaded"
        );
        serde_json::to_string_pretty(&data)?
    };

    println!("{output}");
    Ok(())
}
