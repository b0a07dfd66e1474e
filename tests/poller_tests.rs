mod common;

use common::{allow_list_pipeline, block_time, buy_log, wallet, FakeChain, RecordingSink};
use polywatch::errors::FatalError;
use polywatch::health::HealthState;
use polywatch::ingestion::{PollSettings, Poller, PollerState, TickOutcome};
use polywatch::store::StateStore;

fn poller(chain: &FakeChain, sink: &RecordingSink, health: &HealthState) -> Poller<FakeChain, RecordingSink> {
    poller_with(chain, sink, health, PollSettings::default())
}

fn poller_with(
    chain: &FakeChain,
    sink: &RecordingSink,
    health: &HealthState,
    settings: PollSettings,
) -> Poller<FakeChain, RecordingSink> {
    Poller::new(
        chain.clone(),
        sink.clone(),
        allow_list_pipeline([wallet(1), wallet(2), wallet(3)]),
        vec![polywatch::config::CTF_EXCHANGE.to_string()],
        settings,
        health.clone(),
    )
}

#[tokio::test]
async fn test_unreachable_chain_is_fatal() {
    let chain = FakeChain::at_height(100);
    chain.set_unreachable();
    let mut p = poller(&chain, &RecordingSink::default(), &HealthState::new());

    let err = p.connect().await.unwrap_err();
    assert!(matches!(err, FatalError::Connectivity(_)));
    assert_eq!(p.state(), PollerState::Init);
}

#[tokio::test]
async fn test_tick_before_connect_is_rejected() {
    let chain = FakeChain::at_height(100);
    let mut p = poller(&chain, &RecordingSink::default(), &HealthState::new());
    assert!(p.tick().await.is_err());
    assert!(chain.log_calls().is_empty());
}

#[tokio::test]
async fn test_connect_starts_at_head_and_announces() {
    let chain = FakeChain::at_height(100);
    let sink = RecordingSink::default();
    let mut p = poller(&chain, &sink, &HealthState::new());

    p.connect().await.unwrap();
    assert_eq!(p.state(), PollerState::Connected);
    assert_eq!(p.cursor(), 100);
    assert_eq!(sink.count_containing("Polywatch online"), 1);

    // Nothing new yet.
    assert_eq!(p.tick().await.unwrap(), TickOutcome::Idle);
    assert!(chain.log_calls().is_empty());
}

#[tokio::test]
async fn test_failed_get_logs_leaves_cursor_and_retries_same_range() {
    let chain = FakeChain::at_height(100);
    let health = HealthState::new();
    let mut p = poller(&chain, &RecordingSink::default(), &health);
    p.connect().await.unwrap();

    chain.set_height(110);
    chain.fail_next_get_logs(1);

    assert!(p.tick().await.is_err());
    assert_eq!(p.cursor(), 100);
    assert!(!health.is_healthy(120));

    let outcome = p.tick().await.unwrap();
    assert_eq!(
        outcome,
        TickOutcome::Advanced {
            from: 101,
            to: 110,
            logs: 0
        }
    );
    assert_eq!(chain.log_calls(), vec![(101, 110), (101, 110)]);
    assert_eq!(p.cursor(), 110);
    assert!(health.is_healthy(120));
    assert_eq!(health.snapshot().last_block, 110);
}

#[tokio::test]
async fn test_ranges_are_capped() {
    let chain = FakeChain::at_height(100);
    let settings = PollSettings {
        max_block_range: 500,
        ..PollSettings::default()
    };
    let mut p = poller_with(&chain, &RecordingSink::default(), &HealthState::new(), settings);
    p.connect().await.unwrap();

    chain.set_height(1_200);
    p.tick().await.unwrap();
    p.tick().await.unwrap();
    p.tick().await.unwrap();

    assert_eq!(
        chain.log_calls(),
        vec![(101, 600), (601, 1_100), (1_101, 1_200)]
    );
    assert_eq!(p.cursor(), 1_200);
}

#[tokio::test]
async fn test_tick_feeds_pipeline_and_signals() {
    let chain = FakeChain::at_height(100);
    let sink = RecordingSink::default();
    let mut p = poller(&chain, &sink, &HealthState::new());
    p.connect().await.unwrap();

    chain.push_log(buy_log(wallet(1), 400, 800, 101, 0));
    chain.push_log(buy_log(wallet(2), 400, 800, 102, 0));
    chain.push_log(buy_log(wallet(3), 400, 800, 102, 5));
    // Already behind the cursor; never fetched.
    chain.push_log(buy_log(wallet(3), 400, 800, 99, 0));
    chain.set_height(105);

    let outcome = p.tick().await.unwrap();
    assert_eq!(
        outcome,
        TickOutcome::Advanced {
            from: 101,
            to: 105,
            logs: 3
        }
    );
    assert_eq!(sink.count_containing("Cluster Signal"), 1);
    assert_eq!(p.pipeline().open_windows(), 1);
}

#[tokio::test]
async fn test_block_timestamps_fetched_once_per_block() {
    let chain = FakeChain::at_height(100);
    let settings = PollSettings {
        use_block_timestamps: true,
        ..PollSettings::default()
    };
    let sink = RecordingSink::default();
    let mut p = poller_with(&chain, &sink, &HealthState::new(), settings);
    p.connect().await.unwrap();

    chain.push_log(buy_log(wallet(1), 400, 800, 101, 0));
    chain.push_log(buy_log(wallet(2), 400, 800, 101, 1));
    chain.push_log(buy_log(wallet(3), 400, 800, 103, 0));
    chain.set_height(103);
    p.tick().await.unwrap();

    assert_eq!(chain.block_calls(), vec![101, 103]);
    let alert = sink
        .messages()
        .into_iter()
        .find(|m| m.contains("Cluster Signal"))
        .unwrap();
    // The window spans block 101 to block 103.
    assert!(alert.contains(&block_time(101).format("%H:%M:%S").to_string()));
    assert!(alert.contains(&block_time(103).format("%H:%M:%S").to_string()));
}

#[tokio::test]
async fn test_cursor_resumes_from_store() {
    let dir = tempfile::tempdir().unwrap();
    let chain = FakeChain::at_height(100);

    {
        let store = StateStore::open(dir.path()).unwrap();
        let mut p = poller(&chain, &RecordingSink::default(), &HealthState::new()).with_store(store);
        p.connect().await.unwrap();
        chain.set_height(150);
        p.tick().await.unwrap();
        assert_eq!(p.cursor(), 150);
    }

    // Restart while the chain has moved on: scanning picks up at 151.
    chain.set_height(400);
    let store = StateStore::open(dir.path()).unwrap();
    let mut p = poller(&chain, &RecordingSink::default(), &HealthState::new()).with_store(store);
    p.connect().await.unwrap();
    assert_eq!(p.cursor(), 150);

    p.tick().await.unwrap();
    assert_eq!(chain.log_calls().last(), Some(&(151, 400)));
}
