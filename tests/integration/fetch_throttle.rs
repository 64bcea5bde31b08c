//! Process-wide throttling, retry spacing and cache expiry of the fetch layer.
//!
//! These run on a paused clock, so the timing assertions are exact.

use hostkeep_cli::config::FetchConfig;
use hostkeep_cli::fetch::{CacheDuration, FetchCache, HttpResponse};
use hostkeep_cli::test_utils::FakeTransport;
use std::sync::Arc;
use std::time::Duration;

const FEED: &str = "https://api.github.com/repos/test/engine/releases";

fn fetch_layer(transport: &Arc<FakeTransport>) -> Arc<FetchCache> {
    Arc::new(FetchCache::new(transport.clone(), &FetchConfig::default()))
}

#[tokio::test(start_paused = true)]
async fn test_close_calls_are_spaced_by_min_interval() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond(FEED, HttpResponse::status(503));
    let fetch = fetch_layer(&transport);

    let first = {
        let fetch = fetch.clone();
        tokio::spawn(async move { fetch.fetch(FEED, 1, CacheDuration::Long).await })
    };
    tokio::time::sleep(Duration::from_millis(400)).await;
    let second = {
        let fetch = fetch.clone();
        tokio::spawn(async move { fetch.fetch(FEED, 1, CacheDuration::Long).await })
    };

    assert!(first.await.unwrap().is_none());
    assert!(second.await.unwrap().is_none());

    let starts = transport.call_starts(FEED);
    assert_eq!(starts.len(), 2);
    assert!(starts[1] - starts[0] >= Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_at_most_two_calls_in_flight() {
    let transport = Arc::new(FakeTransport::new());
    transport.set_get_delay(Duration::from_secs(5));
    let fetch = fetch_layer(&transport);

    let urls: Vec<String> = (0..3).map(|i| format!("https://feed.test/{i}")).collect();
    for url in &urls {
        transport.respond(url, HttpResponse::ok("[]"));
    }

    let handles: Vec<_> = urls
        .iter()
        .cloned()
        .map(|url| {
            let fetch = fetch.clone();
            tokio::spawn(async move { fetch.fetch(&url, 1, CacheDuration::Short).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().as_deref(), Some("[]"));
    }

    let mut starts: Vec<_> = transport.calls().into_iter().map(|c| c.started_at).collect();
    starts.sort();
    // The third call waits for one of the first two 5 s calls to finish
    assert!(starts[2] - starts[0] >= Duration::from_secs(5));
    assert!(starts[1] - starts[0] < Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_honors_retry_after() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond_sequence(
        FEED,
        vec![
            HttpResponse {
                status: 429,
                body: String::new(),
                retry_after: Some("7".to_string()),
            },
            HttpResponse::ok("[]"),
        ],
    );
    let fetch = fetch_layer(&transport);

    assert_eq!(fetch.fetch(FEED, 3, CacheDuration::Long).await.as_deref(), Some("[]"));
    let starts = transport.call_starts(FEED);
    assert_eq!(starts.len(), 2);
    assert!(starts[1] - starts[0] >= Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn test_failures_back_off_linearly() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond(FEED, HttpResponse::status(502));
    let fetch = fetch_layer(&transport);

    assert!(fetch.fetch(FEED, 3, CacheDuration::Long).await.is_none());
    let starts = transport.call_starts(FEED);
    assert_eq!(starts.len(), 3);
    assert!(starts[1] - starts[0] >= Duration::from_secs(1));
    assert!(starts[2] - starts[1] >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_expired_entry_is_fetched_once_more() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond_sequence(FEED, vec![HttpResponse::ok("old"), HttpResponse::ok("new")]);
    let fetch = fetch_layer(&transport);

    assert_eq!(fetch.fetch(FEED, 3, CacheDuration::Short).await.as_deref(), Some("old"));
    tokio::time::advance(Duration::from_secs(14 * 60)).await;
    assert_eq!(fetch.fetch(FEED, 3, CacheDuration::Short).await.as_deref(), Some("old"));
    assert_eq!(transport.calls_to(FEED), 1);

    tokio::time::advance(Duration::from_secs(2 * 60)).await;
    assert_eq!(fetch.fetch(FEED, 3, CacheDuration::Short).await.as_deref(), Some("new"));
    assert_eq!(transport.calls_to(FEED), 2);
    assert_eq!(fetch.fetch(FEED, 3, CacheDuration::Short).await.as_deref(), Some("new"));
    assert_eq!(transport.calls_to(FEED), 2);
}
