mod common;

use alloy::primitives::{address, Address, U256};
use common::*;
use std::sync::Arc;
use std::time::Duration;
use yield_tracker::adapters::aave_v3::contracts::IPoolDataProvider;
use yield_tracker::adapters::aave_v3::POOL_DATA_PROVIDER;
use yield_tracker::adapters::tokens::{WETH, WETH_USD_FEED};
use yield_tracker::adapters::uniswap_v3::POSITION_MANAGER_ADDRESS;
use yield_tracker::config::ARBITRUM_CHAIN_ID;
use yield_tracker::services::fixtures::{LOCAL_CHAIN_ID, LOCAL_TEST_WALLET, TEST_WALLETS};
use yield_tracker::services::summarizer::summarize;
use yield_tracker::{LedgerClient, Protocol, ProtocolStatus, Settings, YieldTracker};

const ALICE: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
const BOB: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

fn tracker(ledger: &Arc<MockLedger>) -> YieldTracker {
    let client: Arc<dyn LedgerClient> = ledger.clone();
    YieldTracker::new(client, &Settings::default())
}

/// A live chain where `owner` supplies 2 WETH to Aave at a 3% liquidity rate.
fn live_ledger(owners: &[Address]) -> Arc<MockLedger> {
    let ledger = Arc::new(MockLedger::new(ARBITRUM_CHAIN_ID));
    script_prices(&ledger);
    for owner in owners {
        script_empty_wallet(&ledger, *owner);
        ledger.respond(
            POOL_DATA_PROVIDER,
            &IPoolDataProvider::getUserReserveDataCall { asset: WETH, user: *owner },
            user_reserve(wad(2.0), U256::ZERO, U256::ZERO, U256::ZERO),
        );
    }
    ledger.respond(
        POOL_DATA_PROVIDER,
        &IPoolDataProvider::getReserveDataCall { asset: WETH },
        reserve(U256::from(30_000_000_000_000_000_000_000_000u128), U256::ZERO),
    );
    ledger
}

#[tokio::test]
async fn test_local_fixture_wallet() {
    let ledger = Arc::new(MockLedger::new(LOCAL_CHAIN_ID));
    let tracker = tracker(&ledger);

    let data = tracker.get_wallet_data(LOCAL_TEST_WALLET).await;
    assert_eq!(data.address, LOCAL_TEST_WALLET);
    assert_eq!(data.positions.len(), 4);
    assert!((data.summary.total_value - 11750.0).abs() < 1e-9);
    assert!((data.summary.total_accrued - 125.5).abs() < 1e-9);
    assert!((data.summary.weighted_apy - 896.5 / 11750.0).abs() < 1e-9);
    assert!(data.positions.iter().all(|p| p.chain_id == LOCAL_CHAIN_ID));
    assert_eq!(data.status(Protocol::Aave), Some(ProtocolStatus::Skipped));

    assert_eq!(tracker.format_portfolio_value(data.summary.total_value), "$11.75K");
}

#[tokio::test]
async fn test_local_wallet_on_live_chain_is_fetched() {
    let ledger = live_ledger(&[LOCAL_TEST_WALLET]);
    let tracker = tracker(&ledger);

    let data = tracker.get_wallet_data(LOCAL_TEST_WALLET).await;
    assert_eq!(data.positions.len(), 1);
    assert!((data.summary.total_value - 5000.0).abs() < 1e-9);
    assert_eq!(data.status(Protocol::Aave), Some(ProtocolStatus::Ok));
    assert_eq!(data.status(Protocol::Curve), Some(ProtocolStatus::Empty));
}

#[tokio::test(start_paused = true)]
async fn test_wallet_data_is_cached_until_ttl() {
    let ledger = live_ledger(&[ALICE]);
    let tracker = tracker(&ledger);

    let first = tracker.get_wallet_data(ALICE).await;
    let calls = ledger.call_count();
    assert!(calls > 0);

    let second = tracker.get_wallet_data(ALICE).await;
    assert_eq!(ledger.call_count(), calls);
    assert_eq!(first, second);

    tokio::time::advance(Duration::from_secs(61)).await;
    let third = tracker.get_wallet_data(ALICE).await;
    assert!(ledger.call_count() > calls);
    assert_eq!(third.summary.total_value, first.summary.total_value);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_requests_share_one_fetch() {
    let single = live_ledger(&[ALICE]);
    single.set_latency(Duration::from_millis(50));
    tracker(&single).get_wallet_data(ALICE).await;

    let shared = live_ledger(&[ALICE]);
    shared.set_latency(Duration::from_millis(50));
    let tracker = tracker(&shared);
    let (a, b) = tokio::join!(tracker.get_wallet_data(ALICE), tracker.get_wallet_data(ALICE));

    assert_eq!(a, b);
    assert_eq!(shared.call_count(), single.call_count());
}

#[tokio::test]
async fn test_partial_protocol_failure() {
    let ledger = live_ledger(&[ALICE]);
    script_curve_balances(&ledger, ALICE, wad(10.0), U256::ZERO);
    ledger.fail(POSITION_MANAGER_ADDRESS);
    let tracker = tracker(&ledger);

    let data = tracker.get_wallet_data(ALICE).await;
    assert_eq!(data.positions.len(), 2);
    assert!(data.positions.iter().any(|p| p.protocol == Protocol::Aave));
    assert!(data.positions.iter().any(|p| p.protocol == Protocol::Curve));
    assert_eq!(data.status(Protocol::UniswapV3), Some(ProtocolStatus::Failed));
    assert_eq!(data.status(Protocol::Aave), Some(ProtocolStatus::Ok));
    assert_eq!(data.status(Protocol::Curve), Some(ProtocolStatus::Ok));
    assert!((data.summary.total_value - 5010.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_every_protocol_failing_yields_empty_wallet() {
    let ledger = Arc::new(MockLedger::new(ARBITRUM_CHAIN_ID));
    let tracker = tracker(&ledger);

    let data = tracker.get_wallet_data(ALICE).await;
    assert!(data.positions.is_empty());
    assert_eq!(data.summary.total_value, 0.0);
    assert_eq!(data.summary.weighted_apy, 0.0);
    for protocol in Protocol::ALL {
        assert_eq!(data.status(protocol), Some(ProtocolStatus::Failed));
    }

    // Degraded results are not cached.
    assert_eq!(tracker.cache_stats().data_entries, 0);
    let calls = ledger.call_count();
    tracker.get_wallet_data(ALICE).await;
    assert!(ledger.call_count() > calls);
}

#[tokio::test]
async fn test_empty_test_wallet_gets_mock_data() {
    let ledger = Arc::new(MockLedger::new(ARBITRUM_CHAIN_ID));
    script_prices(&ledger);
    script_empty_wallet(&ledger, TEST_WALLETS[0]);
    let tracker = tracker(&ledger);

    let data = tracker.get_wallet_data(TEST_WALLETS[0]).await;
    assert_eq!(data.positions.len(), 1);
    assert_eq!(data.positions[0].protocol, Protocol::Aave);
    assert!((data.summary.total_value - 2500.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_failing_test_wallet_gets_mock_data() {
    let ledger = Arc::new(MockLedger::new(ARBITRUM_CHAIN_ID));
    let tracker = tracker(&ledger);

    let data = tracker.get_wallet_data(TEST_WALLETS[1]).await;
    assert_eq!(data.positions.len(), 1);
    assert_eq!(data.positions[0].protocol, Protocol::UniswapV3);
}

#[tokio::test]
async fn test_empty_wallet_stays_empty() {
    let ledger = Arc::new(MockLedger::new(ARBITRUM_CHAIN_ID));
    script_prices(&ledger);
    script_empty_wallet(&ledger, BOB);
    let tracker = tracker(&ledger);

    let data = tracker.get_wallet_data(BOB).await;
    assert!(data.positions.is_empty());
    assert_eq!(data.status(Protocol::Aave), Some(ProtocolStatus::Empty));
    assert_eq!(tracker.cache_stats().data_entries, 1);
}

#[tokio::test]
async fn test_multi_wallet_aggregation() {
    let ledger = live_ledger(&[ALICE, BOB]);
    let tracker = tracker(&ledger);

    let data = tracker.get_multi_wallet_data(&[BOB, ALICE]).await;
    assert_eq!(data.wallets.len(), 2);
    assert_eq!(data.wallets[0].address, BOB);
    assert_eq!(data.wallets[1].address, ALICE);

    let all: Vec<_> = data
        .wallets
        .iter()
        .flat_map(|w| w.positions.iter().cloned())
        .collect();
    let expected = summarize(all);
    assert_eq!(data.aggregated.total_value, expected.total_value);
    assert_eq!(data.aggregated.total_accrued, expected.total_accrued);
    assert_eq!(data.aggregated.weighted_apy, expected.weighted_apy);
    assert!((data.aggregated.total_value - 10000.0).abs() < 1e-9);

    // The multi-wallet entry is keyed independently of address order.
    let calls = ledger.call_count();
    let again = tracker.get_multi_wallet_data(&[ALICE, BOB]).await;
    assert_eq!(ledger.call_count(), calls);
    assert_eq!(again.aggregated.total_value, data.aggregated.total_value);
}

#[tokio::test]
async fn test_multi_wallet_with_no_addresses() {
    let ledger = Arc::new(MockLedger::new(ARBITRUM_CHAIN_ID));
    let data = tracker(&ledger).get_multi_wallet_data(&[]).await;
    assert!(data.wallets.is_empty());
    assert_eq!(data.aggregated.total_value, 0.0);
}

#[tokio::test]
async fn test_protocol_breakdown() {
    let ledger = Arc::new(MockLedger::new(LOCAL_CHAIN_ID));
    let tracker = tracker(&ledger);

    let breakdown = tracker.get_protocol_breakdown(LOCAL_TEST_WALLET).await;
    assert_eq!(breakdown.aave.positions.len(), 2);
    assert_eq!(breakdown.uniswap.positions.len(), 1);
    assert_eq!(breakdown.curve.positions.len(), 1);
    assert!((breakdown.uniswap.summary.total_value - 2500.0).abs() < 1e-9);
    assert!((breakdown.curve.summary.weighted_apy - 0.083).abs() < 1e-12);
}

#[tokio::test]
async fn test_live_protocol_breakdown() {
    let ledger = live_ledger(&[ALICE]);
    let breakdown = tracker(&ledger).get_protocol_breakdown(ALICE).await;
    assert_eq!(breakdown.aave.positions.len(), 1);
    assert!(breakdown.uniswap.positions.is_empty());
    assert!(breakdown.curve.positions.is_empty());
}

#[tokio::test]
async fn test_clear_cache() {
    let ledger = live_ledger(&[ALICE]);
    let tracker = tracker(&ledger);

    tracker.get_wallet_data(ALICE).await;
    let stats = tracker.cache_stats();
    assert_eq!(stats.data_entries, 1);
    assert_eq!(stats.price_entries, 1);

    tracker.clear_cache();
    let stats = tracker.cache_stats();
    assert_eq!(stats.data_entries, 0);
    assert_eq!(stats.price_entries, 0);

    let calls = ledger.call_count();
    tracker.get_wallet_data(ALICE).await;
    assert!(ledger.call_count() > calls);
}

#[tokio::test]
async fn test_tracker_from_default_settings() {
    // The RPC client connects lazily, so construction needs no reachable node.
    let tracker = YieldTracker::from_settings(&Settings::default());
    assert!(tracker.is_ok());
}

#[tokio::test]
async fn test_multi_wallet_with_degraded_wallet_is_not_cached() {
    let ledger = Arc::new(MockLedger::new(ARBITRUM_CHAIN_ID));
    let tracker = tracker(&ledger);

    let data = tracker.get_multi_wallet_data(&[ALICE]).await;
    assert_eq!(data.wallets.len(), 1);
    assert!(data.wallets[0].positions.is_empty());
    assert_eq!(data.wallets[0].status(Protocol::Aave), Some(ProtocolStatus::Failed));
    assert_eq!(tracker.cache_stats().data_entries, 0);

    let calls = ledger.call_count();
    tracker.get_multi_wallet_data(&[ALICE]).await;
    assert!(ledger.call_count() > calls);
}

#[tokio::test]
async fn test_healthy_multi_wallet_is_cached() {
    let ledger = live_ledger(&[ALICE, BOB]);
    let tracker = tracker(&ledger);

    tracker.get_multi_wallet_data(&[ALICE, BOB]).await;
    // One entry per wallet plus the combined entry.
    assert_eq!(tracker.cache_stats().data_entries, 3);
}

#[tokio::test(start_paused = true)]
async fn test_orchestration_prices_expire_after_ttl() {
    // Feeds are unscripted, so the oracle serves its fallback table without caching it
    // and only the tracker's own price cache stands between requests and the feeds.
    let ledger = Arc::new(MockLedger::new(ARBITRUM_CHAIN_ID));
    script_empty_wallet(&ledger, ALICE);
    let tracker = tracker(&ledger);

    tracker.get_wallet_data(ALICE).await;
    let feed_calls = ledger.calls_to(WETH_USD_FEED);
    assert!(feed_calls > 0);

    // Wallet data expires at 60 s; prices are still fresh.
    tokio::time::advance(Duration::from_secs(61)).await;
    tracker.get_wallet_data(ALICE).await;
    assert_eq!(ledger.calls_to(WETH_USD_FEED), feed_calls);

    tokio::time::advance(Duration::from_secs(240)).await;
    tracker.get_wallet_data(ALICE).await;
    assert!(ledger.calls_to(WETH_USD_FEED) > feed_calls);
}
