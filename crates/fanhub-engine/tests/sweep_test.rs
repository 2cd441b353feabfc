//! Integration tests for the reconciliation sweep protocol.

mod helpers;

use fanhub_core::traits::store::PresenceStore;
use fanhub_engine::SweepOutcome;
use fanhub_engine::sweeper::sweep_once;

const GC_INTERVAL: f64 = 5.0;
const TIMEOUT: f64 = 10.0;

#[tokio::test]
async fn test_gate_check_skips_recent_sweep() {
    let (_engine, store) = helpers::make_engine();
    store.record_ping("stale", 0.0).await.unwrap();
    store.mark_sweep(100.0).await.unwrap();

    let outcome = sweep_once(store.as_ref(), GC_INTERVAL, TIMEOUT, 103.0)
        .await
        .unwrap();

    assert_eq!(outcome, SweepOutcome::Skipped);
    assert_eq!(store.presence_score("stale").await.unwrap(), Some(0.0));
    assert_eq!(store.last_sweep_at().await.unwrap(), Some(100.0));
}

#[tokio::test]
async fn test_empty_sweep_still_advances_stamp() {
    let (_engine, store) = helpers::make_engine();

    let outcome = sweep_once(store.as_ref(), GC_INTERVAL, TIMEOUT, 25.0)
        .await
        .unwrap();

    assert_eq!(outcome, SweepOutcome::Clean);
    assert_eq!(store.last_sweep_at().await.unwrap(), Some(25.0));
}

#[tokio::test]
async fn test_fresh_clients_survive_sweep() {
    let (_engine, store) = helpers::make_engine();
    store.record_ping("fresh", 20.0).await.unwrap();

    let outcome = sweep_once(store.as_ref(), GC_INTERVAL, TIMEOUT, 25.0)
        .await
        .unwrap();

    assert_eq!(outcome, SweepOutcome::Clean);
    assert_eq!(store.presence_score("fresh").await.unwrap(), Some(20.0));
}

// Client pinged at t=0 and silent through t=25 sits past the
// cutoff (25 - 2*10 = 5) and is evicted everywhere.
#[tokio::test]
async fn test_sweep_evicts_exactly_expired_clients() {
    let (_engine, store) = helpers::make_engine();

    store.record_ping("expired", 0.0).await.unwrap();
    store.record_ping("fresh", 20.0).await.unwrap();
    store.add_subscription("expired", "/foo").await.unwrap();
    store.add_subscription("fresh", "/foo").await.unwrap();
    store.add_subscription("expired", "/bar").await.unwrap();

    let outcome = sweep_once(store.as_ref(), GC_INTERVAL, TIMEOUT, 25.0)
        .await
        .unwrap();

    assert_eq!(outcome, SweepOutcome::Evicted(1));
    assert_eq!(store.presence_score("expired").await.unwrap(), None);
    assert_eq!(store.presence_score("fresh").await.unwrap(), Some(20.0));
    assert_eq!(
        store.channel_subscribers("/foo").await.unwrap(),
        vec!["fresh".to_string()]
    );
    assert!(store.channel_subscribers("/bar").await.unwrap().is_empty());
    assert!(
        store
            .client_subscriptions("expired")
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(store.last_sweep_at().await.unwrap(), Some(25.0));
}

#[tokio::test]
async fn test_second_sweep_in_same_interval_is_gated() {
    let (_engine, store) = helpers::make_engine();
    store.record_ping("expired", 0.0).await.unwrap();

    let first = sweep_once(store.as_ref(), GC_INTERVAL, TIMEOUT, 25.0)
        .await
        .unwrap();
    let second = sweep_once(store.as_ref(), GC_INTERVAL, TIMEOUT, 26.0)
        .await
        .unwrap();

    assert_eq!(first, SweepOutcome::Evicted(1));
    assert_eq!(second, SweepOutcome::Skipped);
    assert_eq!(store.last_sweep_at().await.unwrap(), Some(25.0));
}

// Two overlapping sweeps: the one that commits second loses its
// conditional transaction wholesale and mutates nothing.
#[tokio::test]
async fn test_losing_sweep_leaves_state_unchanged() {
    let (_engine, store) = helpers::make_engine();

    store.record_ping("expired", 0.0).await.unwrap();
    store.add_subscription("expired", "/foo").await.unwrap();

    let mut loser = store.begin_eviction().await.unwrap();
    let candidates = loser.stale_clients(5.0).await.unwrap();
    let channels = loser.channels().await.unwrap();
    assert_eq!(candidates, vec!["expired".to_string()]);

    let winner = sweep_once(store.as_ref(), GC_INTERVAL, TIMEOUT, 25.0)
        .await
        .unwrap();
    assert_eq!(winner, SweepOutcome::Evicted(1));

    let committed = loser
        .commit(&candidates, &channels, 5.0, 26.0)
        .await
        .unwrap();
    assert!(!committed);
    assert_eq!(store.last_sweep_at().await.unwrap(), Some(25.0));
}

#[tokio::test]
async fn test_sweep_with_no_expired_clients_aborts_transaction() {
    let (_engine, store) = helpers::make_engine();
    store.record_ping("fresh", 24.0).await.unwrap();
    store.add_subscription("fresh", "/foo").await.unwrap();

    let outcome = sweep_once(store.as_ref(), GC_INTERVAL, TIMEOUT, 25.0)
        .await
        .unwrap();

    assert_eq!(outcome, SweepOutcome::Clean);
    assert_eq!(
        store.channel_subscribers("/foo").await.unwrap(),
        vec!["fresh".to_string()]
    );
}
