mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockTransport, at, config, fingerprint, scenario_body};
use deferlink::MatchClient;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_share_one_client() {
    let transport = MockTransport::json(200, scenario_body());
    let client = Arc::new(MatchClient::new(config(), transport.clone()));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let client = Arc::clone(&client);
        handles.push(tokio::spawn(async move {
            client.request_match_at(&fingerprint(), at(0, 30)).await
        }));
    }

    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert!(outcome.is_match());
    }
    assert_eq!(transport.calls(), 16);
}

#[tokio::test]
async fn dropping_the_call_cancels_the_request() {
    let transport = MockTransport::slow(Duration::from_secs(30), scenario_body());
    let client = MatchClient::new(config(), transport.clone());

    let result = tokio::time::timeout(
        Duration::from_millis(20),
        client.request_match_at(&fingerprint(), at(0, 30)),
    )
    .await;

    assert!(result.is_err(), "call should still be pending when dropped");
    assert_eq!(transport.calls(), 1);
    assert_eq!(transport.completed(), 0);
}

#[tokio::test]
async fn no_state_is_cached_between_calls() {
    let transport = MockTransport::json(200, scenario_body());
    let client = MatchClient::new(config(), transport.clone());

    let first = client.request_match_at(&fingerprint(), at(0, 30)).await.unwrap();
    let second = client.request_match_at(&fingerprint(), at(2, 0)).await.unwrap();

    assert!(first.is_match());
    assert!(!second.is_match());
    assert_eq!(transport.calls(), 2);
}
