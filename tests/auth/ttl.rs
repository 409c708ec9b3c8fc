use crate::common::{self, CountingSource, FixedPositions, ManualClock};
use chrono::Duration as ChronoDuration;
use nepse_rs::auth::TokenManager;
use std::sync::Arc;
use std::time::Duration;

const T: i64 = 1_700_000_000;

fn local_clock_response() -> nepse_rs::TokenResponse {
    let mut body = common::response(common::SALTED);
    body.server_time = 0;
    body
}

#[tokio::test]
async fn token_expires_exactly_at_ttl() {
    let clock = Arc::new(ManualClock::at(T));
    let source = Arc::new(CountingSource::new(local_clock_response(), Duration::ZERO));
    let mgr = TokenManager::builder(source.clone(), Arc::new(FixedPositions))
        .clock(clock.clone())
        .build();
    assert_eq!(mgr.ttl(), Duration::from_secs(45));

    mgr.access_token().await.unwrap();
    assert_eq!(mgr.cached().await.unwrap().acquired_at.timestamp(), T);

    clock.advance(ChronoDuration::seconds(45) - ChronoDuration::milliseconds(1));
    mgr.access_token().await.unwrap();
    assert_eq!(source.calls(), 1);

    clock.advance(ChronoDuration::milliseconds(2));
    mgr.access_token().await.unwrap();
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn ttl_is_configurable() {
    let clock = Arc::new(ManualClock::at(T));
    let source = Arc::new(CountingSource::new(local_clock_response(), Duration::ZERO));
    let mgr = TokenManager::builder(source.clone(), Arc::new(FixedPositions))
        .clock(clock.clone())
        .ttl(Duration::from_secs(5))
        .build();

    mgr.access_token().await.unwrap();
    clock.advance(ChronoDuration::seconds(6));
    mgr.access_token().await.unwrap();
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn server_time_anchors_the_cache_timestamp() {
    let clock = Arc::new(ManualClock::at(T + 3_600));
    let mut body = common::response(common::SALTED);
    body.server_time = 1_700_000_000_999;
    let source = Arc::new(CountingSource::new(body, Duration::ZERO));
    let mgr = TokenManager::builder(source.clone(), Arc::new(FixedPositions))
        .clock(clock.clone())
        .build();

    assert_eq!(mgr.access_token().await.unwrap(), common::CLEAN);
    let cached = mgr.cached().await.unwrap();
    assert_eq!(cached.acquired_at.timestamp(), 1_700_000_000);

    // an hour behind the local clock, so already stale
    mgr.access_token().await.unwrap();
    assert_eq!(source.calls(), 2);
}
