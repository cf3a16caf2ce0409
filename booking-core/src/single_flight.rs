//! Keyed in-flight deduplication. Ported from
//! `examples/original_source/src/modules/bookings/single_flight.py`'s
//! lock-release-before-await structure: the registry lock is held only
//! around map bookkeeping, never across the awaited task.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

struct Entry<V> {
    generation: u64,
    fut: Shared<BoxFuture<'static, V>>,
}

pub struct SingleFlight<K, V> {
    state: Mutex<HashMap<K, Entry<V>>>,
    next_generation: AtomicU64,
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Runs `make_task` at most once per `key` among overlapping concurrent
    /// callers. The produced future is detached via `tokio::spawn`, so it
    /// keeps running even if this caller is later cancelled (§5's
    /// cancellation contract): other waiters still receive its result, and a
    /// completed fetch still updates the cache.
    pub async fn run<F, Fut>(&self, key: K, make_task: F, use_dedup: bool) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let mut guard = self.state.lock();
        if use_dedup {
            if let Some(entry) = guard.get(&key) {
                let fut = entry.fut.clone();
                drop(guard);
                return fut.await;
            }
        }

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let handle = tokio::spawn(make_task());
        let shared: Shared<BoxFuture<'static, V>> = async move {
            handle.await.expect("single-flight task panicked")
        }
        .boxed()
        .shared();

        guard.insert(
            key.clone(),
            Entry {
                generation,
                fut: shared.clone(),
            },
        );
        drop(guard);

        let result = shared.await;

        let mut guard = self.state.lock();
        if matches!(guard.get(&key), Some(e) if e.generation == generation) {
            guard.remove(&key);
        }
        result
    }

    pub fn in_flight_count(&self) -> usize {
        self.state.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Barrier;

    #[tokio::test]
    async fn dedups_concurrent_callers_with_same_key() {
        let sf: Arc<SingleFlight<&'static str, u32>> = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicU64::new(0));
        let barrier = Arc::new(Barrier::new(50));

        let mut handles = Vec::new();
        for _ in 0..50 {
            let sf = sf.clone();
            let calls = calls.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                sf.run(
                    "k",
                    || {
                        let calls = calls.clone();
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                            42u32
                        }
                    },
                    true,
                )
                .await
            }));
        }

        for h in handles {
            assert_eq!(h.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(sf.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn distinct_keys_run_independently() {
        let sf: SingleFlight<u32, u32> = SingleFlight::new();
        let a = sf.run(1, || async { 10 }, true);
        let b = sf.run(2, || async { 20 }, true);
        let (a, b) = tokio::join!(a, b);
        assert_eq!((a, b), (10, 20));
    }

    #[tokio::test]
    async fn no_dedup_runs_a_fresh_task_each_time() {
        let sf: SingleFlight<&'static str, u32> = SingleFlight::new();
        let calls = Arc::new(AtomicU64::new(0));
        for _ in 0..3 {
            let calls = calls.clone();
            sf.run(
                "k",
                || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    7u32
                },
                false,
            )
            .await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn completed_task_is_cleared_so_next_caller_refetches() {
        let sf: SingleFlight<&'static str, u32> = SingleFlight::new();
        sf.run("k", || async { 1 }, true).await;
        assert_eq!(sf.in_flight_count(), 0);
        let calls = Arc::new(AtomicU64::new(0));
        let calls2 = calls.clone();
        sf.run(
            "k",
            || async move {
                calls2.fetch_add(1, Ordering::SeqCst);
                2
            },
            true,
        )
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
