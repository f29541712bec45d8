//! In-flight request deduplication.
//!
//! Concurrent callers that present the same key share one underlying operation. The
//! entry lives only while the operation is running: once it finishes (successfully or
//! not) the key is free again and the next call starts a fresh operation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tracing::debug;

/// Why a shared operation produced no value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DedupError {
    #[error("Request {key} aborted: {reason}")]
    Aborted { key: String, reason: String },
}

type Pending<T> = Shared<BoxFuture<'static, Result<T, DedupError>>>;

/// Build a deduplication key from an action name, its input and its options.
///
/// Options are serialized as JSON, `null` when absent.
pub fn dedup_key<O: Serialize + ?Sized>(action: &str, content: &str, options: Option<&O>) -> String {
    let options = serde_json::to_string(&options).unwrap_or_else(|_| "null".to_string());
    format!("{action}:{content}:{options}")
}

/// Maps keys to in-flight operations.
pub struct RequestDeduplicator<T> {
    pending: Arc<Mutex<HashMap<String, Pending<T>>>>,
}

impl<T> Clone for RequestDeduplicator<T> {
    fn clone(&self) -> Self {
        Self {
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<T> Default for RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Await the operation registered under `key`, starting it with `make` if none is
    /// in flight. `make` is not called when an operation is joined.
    ///
    /// The operation runs on its own task, so it completes (and releases its key) even if
    /// every caller stops waiting.
    pub async fn run<F, Fut>(&self, key: impl Into<String>, make: F) -> Result<T, DedupError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let key = key.into();

        let shared = {
            let mut pending = self.pending.lock().await;
            match pending.get(&key) {
                Some(existing) => {
                    debug!(key = %preview(&key), "Joining in-flight request");
                    existing.clone()
                }
                None => {
                    debug!(key = %preview(&key), "Starting request");
                    let shared = self.spawn(key.clone(), make());
                    pending.insert(key, shared.clone());
                    shared
                }
            }
        };

        shared.await
    }

    /// Number of operations currently in flight.
    pub async fn in_flight(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn is_pending(&self, key: &str) -> bool {
        self.pending.lock().await.contains_key(key)
    }

    /// Must be called with the map locked so the entry is inserted before it can be removed.
    fn spawn<Fut>(&self, key: String, operation: Fut) -> Pending<T>
    where
        Fut: Future<Output = T> + Send + 'static,
    {
        let pending = Arc::clone(&self.pending);
        let label = preview(&key);
        let worker = tokio::spawn(operation);

        let supervisor = {
            let label = label.clone();
            tokio::spawn(async move {
                let result = worker.await.map_err(|e| aborted(&label, &e));
                pending.lock().await.remove(&key);
                result
            })
        };

        async move {
            supervisor
                .await
                .unwrap_or_else(|e| Err(aborted(&label, &e)))
        }
        .boxed()
        .shared()
    }
}

fn aborted(key: &str, err: &JoinError) -> DedupError {
    DedupError::Aborted {
        key: key.to_string(),
        reason: if err.is_panic() {
            "operation panicked".to_string()
        } else {
            "operation cancelled".to_string()
        },
    }
}

/// Keys embed the full content; keep logs short.
fn preview(key: &str) -> String {
    const MAX: usize = 64;
    if key.chars().count() <= MAX {
        key.to_string()
    } else {
        let head: String = key.chars().take(MAX).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::oneshot;

    #[test]
    fn key_includes_options_json() {
        #[derive(Serialize)]
        struct Opts {
            style: &'static str,
        }
        assert_eq!(
            dedup_key("summarize", "text", Some(&Opts { style: "concise" })),
            r#"summarize:text:{"style":"concise"}"#
        );
        assert_eq!(dedup_key::<Opts>("summarize", "text", None), "summarize:text:null");
        assert_eq!(dedup_key("keyPoints", "text", Some(&5)), "keyPoints:text:5");
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_operation() {
        let dedup: RequestDeduplicator<String> = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let first = {
            let dedup = dedup.clone();
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                dedup
                    .run("k", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        release_rx.await.ok();
                        "shared".to_string()
                    })
                    .await
            })
        };

        // Wait until the first call has registered its operation.
        while !dedup.is_pending("k").await {
            tokio::task::yield_now().await;
        }

        let second = {
            let dedup = dedup.clone();
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                dedup
                    .run("k", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        "fresh".to_string()
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(dedup.in_flight().await, 1);
        release_tx.send(()).unwrap();

        assert_eq!(first.await.unwrap().unwrap(), "shared");
        assert_eq!(second.await.unwrap().unwrap(), "shared");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(dedup.in_flight().await, 0);
    }

    #[tokio::test]
    async fn completed_key_starts_fresh_operation() {
        let dedup: RequestDeduplicator<usize> = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for expected in 1..=2 {
            let calls = Arc::clone(&calls);
            let value = dedup
                .run("k", move || async move { calls.fetch_add(1, Ordering::SeqCst) + 1 })
                .await
                .unwrap();
            assert_eq!(value, expected);
        }
        assert!(!dedup.is_pending("k").await);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_coalesce() {
        let dedup: RequestDeduplicator<&'static str> = RequestDeduplicator::new();
        let (a, b) = tokio::join!(
            dedup.run("a", || async { "a" }),
            dedup.run("b", || async { "b" }),
        );
        assert_eq!(a.unwrap(), "a");
        assert_eq!(b.unwrap(), "b");
    }

    #[tokio::test]
    async fn failed_operation_releases_key() {
        let dedup: RequestDeduplicator<Result<u32, String>> = RequestDeduplicator::new();
        let result = dedup
            .run("k", || async { Err::<u32, _>("upstream down".to_string()) })
            .await
            .unwrap();
        assert_eq!(result, Err("upstream down".to_string()));
        assert_eq!(dedup.in_flight().await, 0);
    }

    #[tokio::test]
    async fn panicking_operation_is_reported_and_released() {
        let dedup: RequestDeduplicator<u32> = RequestDeduplicator::new();
        async fn explode() -> u32 {
            panic!("boom")
        }

        let err = dedup.run("k", explode).await.unwrap_err();
        assert_eq!(
            err,
            DedupError::Aborted {
                key: "k".to_string(),
                reason: "operation panicked".to_string(),
            }
        );
        assert_eq!(dedup.in_flight().await, 0);
    }

    #[tokio::test]
    async fn operation_outlives_abandoned_caller() {
        let dedup: RequestDeduplicator<()> = RequestDeduplicator::new();
        let (done_tx, done_rx) = oneshot::channel::<()>();

        let caller = {
            let dedup = dedup.clone();
            tokio::spawn(async move {
                dedup
                    .run("k", move || async move {
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        let _ = done_tx.send(());
                    })
                    .await
            })
        };
        while !dedup.is_pending("k").await {
            tokio::task::yield_now().await;
        }
        caller.abort();

        tokio::time::timeout(Duration::from_secs(2), done_rx)
            .await
            .expect("operation should finish")
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            while dedup.in_flight().await > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("entry should be released");
    }

    #[tokio::test]
    async fn cancelled_task_names_its_key() {
        let task = tokio::spawn(std::future::pending::<()>());
        task.abort();
        let err = task.await.unwrap_err();

        let long_key = format!("summarize:{}:null", "y".repeat(100));
        match aborted(&preview(&long_key), &err) {
            DedupError::Aborted { key, reason } => {
                assert!(key.starts_with("summarize:yyy"));
                assert!(key.ends_with('…'));
                assert_eq!(reason, "operation cancelled");
            }
        }
    }

    #[test]
    fn preview_truncates_long_keys() {
        let key = "x".repeat(200);
        assert_eq!(preview(&key).chars().count(), 65);
        assert_eq!(preview("short"), "short");
    }
}
