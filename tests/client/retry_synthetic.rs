use crate::common;
use httpmock::Method::GET;
use nepse_rs::{NepseClient, NepseError, RetryConfig};
use url::Url;

fn client_with_retry(server: &httpmock::MockServer, retry: RetryConfig) -> NepseClient {
    NepseClient::builder()
        .base_url(Url::parse(&server.base_url()).unwrap())
        .wasm_module(common::FIXED_POSITIONS_WAT)
        .retry_config(retry)
        .build()
        .unwrap()
}

#[tokio::test]
async fn persistent_503_exhausts_the_budget() {
    let server = common::setup_server();
    let _prove = common::mock_prove(&server, common::SALTED);
    let api = server.mock(|when, then| {
        when.method(GET).path("/api/nots/nepse-data/market-open");
        then.status(503).body("busy");
    });
    let client = client_with_retry(&server, common::fast_retry(3));

    let err = client
        .get_raw(&client.endpoints().market_open)
        .await
        .unwrap_err();

    api.assert_hits(4);
    match err {
        NepseError::ServerError { status, .. } => assert_eq!(status, 503),
        other => panic!("expected ServerError, got {other:?}"),
    }
}

#[tokio::test]
async fn per_call_override_replaces_the_default() {
    let server = common::setup_server();
    let _prove = common::mock_prove(&server, common::SALTED);
    let api = server.mock(|when, then| {
        when.method(GET).path("/api/nots/nepse-data/market-open");
        then.status(502);
    });
    let client = client_with_retry(&server, common::fast_retry(3));

    let once = common::fast_retry(1);
    let err = client
        .get_raw_with_retry(&client.endpoints().market_open, Some(&once))
        .await
        .unwrap_err();

    api.assert_hits(2);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn disabled_retry_sends_once() {
    let server = common::setup_server();
    let _prove = common::mock_prove(&server, common::SALTED);
    let api = server.mock(|when, then| {
        when.method(GET).path("/api/nots/nepse-data/supplydemand");
        then.status(500);
    });
    let client = NepseClient::builder()
        .base_url(Url::parse(&server.base_url()).unwrap())
        .wasm_module(common::FIXED_POSITIONS_WAT)
        .retry_config(common::fast_retry(5))
        .retry_enabled(false)
        .build()
        .unwrap();

    assert!(client.get_raw(&client.endpoints().supply_demand).await.is_err());
    api.assert_hits(1);
}

#[tokio::test]
async fn token_endpoint_is_retried_too() {
    let server = common::setup_server();
    let prove = server.mock(|when, then| {
        when.method(GET).path("/api/authenticate/prove");
        then.status(503);
    });
    let client = client_with_retry(&server, common::fast_retry(2));

    assert!(client.access_token().await.is_err());
    prove.assert_hits(3);
}
