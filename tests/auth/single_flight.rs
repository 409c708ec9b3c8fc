use crate::common::{self, CountingSource, FixedPositions, ManualClock};
use chrono::Duration as ChronoDuration;
use futures::FutureExt;
use futures::future::join_all;
use nepse_rs::auth::TokenManager;
use nepse_rs::AuthErrorKind;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cold_cache_herd_triggers_one_fetch() {
    let source = Arc::new(CountingSource::new(
        common::response(common::SALTED),
        Duration::from_millis(150),
    ));
    let mgr = TokenManager::new(source.clone(), Arc::new(FixedPositions));

    let tasks = (0..32).map(|_| {
        let mgr = mgr.clone();
        tokio::spawn(async move { mgr.access_token().await })
    });
    let results = join_all(tasks).await;

    assert_eq!(source.calls(), 1);
    for r in results {
        assert_eq!(r.unwrap().unwrap(), common::CLEAN);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn herd_shares_the_same_error() {
    let source = Arc::new(CountingSource::failing(503, Duration::from_millis(100)));
    let mgr = TokenManager::new(source.clone(), Arc::new(FixedPositions));

    let results = join_all((0..16).map(|_| mgr.access_token())).await;

    assert_eq!(source.calls(), 1);
    for r in results {
        let err = r.unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::Transport);
        assert!(err.to_string().contains("503"));
    }
    assert!(mgr.cached().await.is_none());
}

#[tokio::test]
async fn failed_round_is_not_cached() {
    let source = Arc::new(CountingSource::sequence(
        vec![Err(502), Ok(common::response(common::SALTED))],
        Duration::ZERO,
    ));
    let mgr = TokenManager::new(source.clone(), Arc::new(FixedPositions));

    assert!(mgr.access_token().await.is_err());
    assert_eq!(mgr.access_token().await.unwrap(), common::CLEAN);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn valid_token_is_served_without_fetching() {
    let source = Arc::new(CountingSource::new(
        common::response(common::SALTED),
        Duration::ZERO,
    ));
    let mgr = TokenManager::new(source.clone(), Arc::new(FixedPositions));

    for _ in 0..5 {
        assert_eq!(mgr.access_token().await.unwrap(), common::CLEAN);
    }
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn force_refresh_replaces_a_valid_token() {
    let source = Arc::new(CountingSource::sequence(
        vec![
            Ok(common::response(common::SALTED)),
            Ok(common::response("Qf1r2e3s4hTK")),
        ],
        Duration::ZERO,
    ));
    let mgr = TokenManager::new(source.clone(), Arc::new(FixedPositions));

    assert_eq!(mgr.access_token().await.unwrap(), common::CLEAN);
    mgr.force_refresh().await.unwrap();
    assert_eq!(source.calls(), 2);
    assert_eq!(mgr.access_token().await.unwrap(), "freshTK");
    assert_eq!(source.calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn forced_and_ordinary_refresh_collapse() {
    let source = Arc::new(CountingSource::new(
        common::response(common::SALTED),
        Duration::from_millis(150),
    ));
    let mgr = TokenManager::new(source.clone(), Arc::new(FixedPositions));

    let (tok, forced) = tokio::join!(mgr.access_token(), mgr.force_refresh());
    assert_eq!(tok.unwrap(), common::CLEAN);
    forced.unwrap();
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn cancelled_driver_does_not_abort_the_fetch() {
    let source = Arc::new(CountingSource::new(
        common::response(common::SALTED),
        Duration::from_millis(200),
    ));
    let mgr = TokenManager::new(source.clone(), Arc::new(FixedPositions));

    let impatient = tokio::time::timeout(Duration::from_millis(10), mgr.access_token()).await;
    assert!(impatient.is_err(), "first caller should time out");

    assert_eq!(mgr.access_token().await.unwrap(), common::CLEAN);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn cancelled_waiter_leaves_others_untouched() {
    let source = Arc::new(CountingSource::new(
        common::response(common::SALTED),
        Duration::from_millis(200),
    ));
    let mgr = TokenManager::new(source.clone(), Arc::new(FixedPositions));

    let patient = {
        let mgr = mgr.clone();
        tokio::spawn(async move { mgr.access_token().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let impatient = tokio::time::timeout(Duration::from_millis(10), mgr.access_token()).await;
    assert!(impatient.is_err());

    assert_eq!(patient.await.unwrap().unwrap(), common::CLEAN);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn forced_refresh_fetches_even_if_the_joined_flight_would_reuse_the_cache() {
    let clock = Arc::new(ManualClock::at(1_700_000_000));
    let mut first = common::response(common::SALTED);
    first.server_time = 0;
    let mut second = common::response("Qf1r2e3s4hTK");
    second.server_time = 0;
    let source = Arc::new(CountingSource::sequence(
        vec![Ok(first), Ok(second)],
        Duration::ZERO,
    ));
    let mgr = TokenManager::builder(source.clone(), Arc::new(FixedPositions))
        .clock(clock.clone())
        .build();

    assert_eq!(mgr.access_token().await.unwrap(), common::CLEAN);

    // a caller finds the token stale and starts an ordinary flight
    clock.advance(ChronoDuration::seconds(100));
    assert!(mgr.access_token().now_or_never().is_none());

    // by the time that flight re-checks, the cached token looks valid again
    clock.advance(ChronoDuration::seconds(-100));

    mgr.force_refresh().await.unwrap();
    assert_eq!(source.calls(), 2, "forced refresh must fetch");
    assert_eq!(mgr.access_token().await.unwrap(), "freshTK");
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn ordinary_flight_without_force_reuses_a_revalidated_token() {
    let clock = Arc::new(ManualClock::at(1_700_000_000));
    let mut body = common::response(common::SALTED);
    body.server_time = 0;
    let source = Arc::new(CountingSource::new(body, Duration::ZERO));
    let mgr = TokenManager::builder(source.clone(), Arc::new(FixedPositions))
        .clock(clock.clone())
        .build();

    mgr.access_token().await.unwrap();

    clock.advance(ChronoDuration::seconds(100));
    let mut pending = Box::pin(mgr.access_token());
    assert!((&mut pending).now_or_never().is_none());
    clock.advance(ChronoDuration::seconds(-100));

    assert_eq!(pending.await.unwrap(), common::CLEAN);
    assert_eq!(source.calls(), 1);
}
