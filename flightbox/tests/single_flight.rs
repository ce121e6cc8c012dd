use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use flightbox::{
    CacheKey, CancellationToken, FetchError, FetchResult, Fetcher, MemoCache, Outcome,
    RegistryError, Snapshot,
};
use futures::future::join_all;
use http::StatusCode;
use tokio::sync::{Barrier, Notify};

type Cache = MemoCache<CacheKey>;

fn key(s: &str) -> CacheKey {
    CacheKey::new(format!("https://pypi.org/pypi/{s}/json"))
}

/// Fetcher answering with a fixed status and counting its calls.
struct Fixed {
    status: StatusCode,
    body: &'static str,
    delay: Duration,
    calls: AtomicUsize,
}

impl Fixed {
    fn new(status: StatusCode, body: &'static str) -> Arc<Self> {
        Arc::new(Self {
            status,
            body,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    fn slow(status: StatusCode, body: &'static str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            status,
            body,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher<CacheKey> for Fixed {
    async fn fetch(&self, _key: &CacheKey, cancel: CancellationToken) -> FetchResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::select! {
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            _ = tokio::time::sleep(self.delay) => Ok(Outcome::new(self.status, self.body)),
        }
    }
}

/// Fetcher that fails at the transport level.
struct Unreachable {
    calls: AtomicUsize,
}

#[async_trait]
impl Fetcher<CacheKey> for Unreachable {
    async fn fetch(&self, _key: &CacheKey, _cancel: CancellationToken) -> FetchResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(FetchError::transport(std::io::Error::other(
            "connection refused",
        )))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_fetch() {
    let cache = Cache::default();
    let fetcher = Fixed::slow(StatusCode::OK, "requests", Duration::from_millis(200));
    let barrier = Arc::new(Barrier::new(16));

    let tasks = (0..16).map(|_| {
        let cache = cache.clone();
        let fetcher = Arc::clone(&fetcher);
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            cache
                .get_from(key("requests"), fetcher, CancellationToken::new())
                .await
        })
    });

    for result in join_all(tasks).await {
        assert_eq!(result.unwrap().unwrap(), Bytes::from_static(b"requests"));
    }
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.in_flight(), 0);
}

#[tokio::test]
async fn test_collapsed_callers_in_one_task() {
    let cache = Cache::default();
    let fetcher = Fixed::slow(StatusCode::NOT_FOUND, "", Duration::from_millis(20));

    let lookups = (0..8).map(|_| {
        cache.get_from(
            key("missing"),
            Arc::clone(&fetcher),
            CancellationToken::new(),
        )
    });

    for result in join_all(lookups).await {
        let error = result.unwrap_err();
        assert!(matches!(error, RegistryError::NegativeStatus(s) if s == StatusCode::NOT_FOUND));
    }
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_success_is_cached() {
    let cache = Cache::default();
    let fetcher = Fixed::new(StatusCode::OK, "{\"info\":{}}");

    for _ in 0..3 {
        let body = cache
            .get_from(key("requests"), Arc::clone(&fetcher), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(body, "{\"info\":{}}");
    }
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_negative_answers_are_cached() {
    let cache = Cache::default();

    for status in [StatusCode::NOT_FOUND, StatusCode::UNAUTHORIZED] {
        let fetcher = Fixed::new(status, "");
        let k = key(status.as_str());

        let first = cache
            .get_from(k.clone(), Arc::clone(&fetcher), CancellationToken::new())
            .await
            .unwrap_err();
        let second = cache
            .get_from(k, Arc::clone(&fetcher), CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(first.status(), Some(status));
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(
            first.to_string(),
            format!("registry query status: {status}")
        );
        assert_eq!(fetcher.calls(), 1);
    }
}

#[tokio::test]
async fn test_unexpected_status_is_fetched_again() {
    let cache = Cache::default();
    let fetcher = Fixed::new(StatusCode::INTERNAL_SERVER_ERROR, "oops");

    for expected_calls in 1..=3 {
        let error = cache
            .get_from(key("flaky"), Arc::clone(&fetcher), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(
            matches!(error, RegistryError::UnexpectedStatus(s) if s == StatusCode::INTERNAL_SERVER_ERROR)
        );
        assert_eq!(fetcher.calls(), expected_calls);
    }
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_transport_error_is_fetched_again() {
    let cache = Cache::default();
    let fetcher = Arc::new(Unreachable {
        calls: AtomicUsize::new(0),
    });

    for _ in 0..2 {
        let error = cache
            .get_from(key("down"), Arc::clone(&fetcher), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(error, RegistryError::Transport(_)));
        assert!(error.to_string().starts_with("registry query failed"));
    }
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);

    // Recovers once the registry answers.
    let body = cache
        .get_from(key("down"), Fixed::new(StatusCode::OK, "up"), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(body, "up");
}

#[tokio::test]
async fn test_cancellation_reaches_every_waiter() {
    let cache = Cache::default();
    let cancel = CancellationToken::new();
    let fetcher = Fixed::slow(StatusCode::OK, "late", Duration::from_secs(3600));

    let mut leader = Box::pin(cache.get_from(key("slow"), Arc::clone(&fetcher), cancel.clone()));
    assert!(futures::poll!(leader.as_mut()).is_pending());

    let mut waiters: Vec<_> = (0..4)
        .map(|_| {
            Box::pin(cache.get_from(
                key("slow"),
                Arc::clone(&fetcher),
                CancellationToken::new(),
            ))
        })
        .collect();
    for waiter in &mut waiters {
        assert!(futures::poll!(waiter.as_mut()).is_pending());
    }
    assert_eq!(cache.in_flight(), 1);

    cancel.cancel();

    assert!(leader.await.unwrap_err().is_cancelled());
    for result in join_all(waiters).await {
        let error = result.unwrap_err();
        assert!(error.is_cancelled());
        assert_eq!(error.to_string(), "registry query cancelled");
    }
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(cache.in_flight(), 0);
    assert!(!cache.contains(&key("slow")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_distinct_keys_do_not_block_each_other() {
    let cache = Cache::default();
    let release = Arc::new(Notify::new());

    let blocked = {
        let cache = cache.clone();
        let release = Arc::clone(&release);
        tokio::spawn(async move {
            cache
                .get(key("blocked"), move || async move {
                    release.notified().await;
                    Ok::<_, FetchError>(Outcome::new(StatusCode::OK, "blocked"))
                })
                .await
        })
    };

    let body = tokio::time::timeout(
        Duration::from_secs(5),
        cache.get_from(key("free"), Fixed::new(StatusCode::OK, "free"), CancellationToken::new()),
    )
    .await
    .expect("unrelated key must not wait")
    .unwrap();
    assert_eq!(body, "free");

    release.notify_one();
    assert_eq!(blocked.await.unwrap().unwrap(), "blocked");
    assert_eq!(cache.len(), 2);
}

async fn explode() -> FetchResult {
    panic!("fetch panicked")
}

#[tokio::test]
async fn test_panicking_fetch_does_not_wedge_key() {
    let cache = Cache::default();

    let crashed = {
        let cache = cache.clone();
        tokio::spawn(async move {
            cache
                .get(key("boom"), explode)
                .await
        })
    };
    assert!(crashed.await.unwrap_err().is_panic());
    assert_eq!(cache.in_flight(), 0);

    let body = cache
        .get_from(key("boom"), Fixed::new(StatusCode::OK, "fine"), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(body, "fine");
}

#[tokio::test]
async fn test_snapshot_seeds_cache() {
    let timestamp = "2026-02-01T08:30:00Z".parse().unwrap();
    let snapshot = Snapshot::new(timestamp)
        .entry(key("requests"), 200, "snapshot body")
        .entry(key("missing"), 404, "")
        .entry(key("broken"), 503, "unavailable");

    let cache = Cache::with_snapshot(Default::default(), snapshot);
    assert_eq!(cache.preloaded_at(), Some(timestamp));
    assert_eq!(cache.len(), 2);

    let fetcher = Fixed::new(StatusCode::OK, "fresh");
    let body = cache
        .get_from(key("requests"), Arc::clone(&fetcher), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(body, "snapshot body");

    let error = cache
        .get_from(key("missing"), Arc::clone(&fetcher), CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(error.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(fetcher.calls(), 0);

    // The 503 record was not loaded, so this one is fetched.
    let body = cache
        .get_from(key("broken"), Arc::clone(&fetcher), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(body, "fresh");
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_abandoned_fetch_is_resumed_by_next_caller() {
    let cache = Cache::default();
    let fetcher = Fixed::slow(StatusCode::OK, "resumed", Duration::from_millis(20));

    let mut first = Box::pin(cache.get_from(
        key("abandoned"),
        Arc::clone(&fetcher),
        CancellationToken::new(),
    ));
    assert!(futures::poll!(first.as_mut()).is_pending());
    drop(first);
    assert_eq!(cache.in_flight(), 1);

    let body = cache
        .get_from(key("abandoned"), Arc::clone(&fetcher), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(body, "resumed");
    assert_eq!(fetcher.calls(), 1);
}
