use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use rand::{thread_rng, Rng};
use tokio::task::JoinHandle;

use crate::{dispatcher::Dispatcher, request::Request, Error, Result};

/// Receives a notification every time a flag is evaluated.
///
/// Implementations must be cheap and must not block: `track_event` is called inline on every flag
/// lookup. The result of the lookup never depends on the collector.
pub trait AnalyticsCollector: Send + Sync {
    /// Record a single evaluation of `feature_name`.
    fn track_event(&self, feature_name: &str);
}

pub(crate) struct NoopAnalyticsCollector;
impl AnalyticsCollector for NoopAnalyticsCollector {
    fn track_event(&self, _feature_name: &str) {}
}

impl<T: Fn(&str) + Send + Sync> AnalyticsCollector for T {
    fn track_event(&self, feature_name: &str) {
        self(feature_name);
    }
}

/// Persistence for evaluation counts that have not been uploaded yet.
pub trait AnalyticsStore: Send + Sync {
    /// Load counts saved by a previous run.
    fn load(&self) -> HashMap<String, u64>;

    /// Replace saved counts.
    ///
    /// Called from the flush task and when the collector is dropped, never from flag lookups.
    /// Implementations should still return quickly, as they may run on a runtime worker thread.
    fn save(&self, counts: &HashMap<String, u64>);
}

impl<T: AnalyticsStore + ?Sized> AnalyticsStore for Arc<T> {
    fn load(&self) -> HashMap<String, u64> {
        (**self).load()
    }

    fn save(&self, counts: &HashMap<String, u64>) {
        (**self).save(counts)
    }
}

/// [`AnalyticsStore`] that keeps counts in memory only.
#[derive(Debug, Default)]
pub struct MemoryAnalyticsStore {
    counts: Mutex<HashMap<String, u64>>,
}

impl MemoryAnalyticsStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnalyticsStore for MemoryAnalyticsStore {
    fn load(&self) -> HashMap<String, u64> {
        lock(&self.counts).clone()
    }

    fn save(&self, counts: &HashMap<String, u64>) {
        *lock(&self.counts) = counts.clone();
    }
}

/// Counts flag evaluations and periodically uploads them to Flagsmith.
///
/// Counts live in memory and are written to the [`AnalyticsStore`] on every flush attempt and on
/// drop, so evaluations themselves never touch the store.
///
/// The upload task runs on the Tokio runtime that was current when the collector was created and
/// is stopped when the collector is dropped.
pub struct FlagAnalytics {
    inner: Arc<AnalyticsInner>,
    flush_task: JoinHandle<()>,
}

struct AnalyticsInner {
    counts: Mutex<HashMap<String, u64>>,
    store: Arc<dyn AnalyticsStore>,
    dispatcher: Dispatcher,
    timeout: Duration,
}

impl FlagAnalytics {
    pub(crate) fn start(
        dispatcher: Dispatcher,
        store: Arc<dyn AnalyticsStore>,
        flush_period: Duration,
        timeout: Duration,
    ) -> Result<FlagAnalytics> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            Error::Configuration("analytics requires a running Tokio runtime".to_owned())
        })?;

        let inner = Arc::new(AnalyticsInner {
            counts: Mutex::new(store.load()),
            store,
            dispatcher,
            timeout,
        });

        let flush_task = {
            let inner = Arc::clone(&inner);
            runtime.spawn(async move {
                loop {
                    tokio::time::sleep(jitter(flush_period, flush_period / 10)).await;
                    if let Err(err) = inner.flush().await {
                        // Counts are kept and retried on the next tick.
                        log::warn!(target: "flagsmith", "failed to upload analytics: {:?}", err);
                    }
                }
            })
        };

        Ok(FlagAnalytics { inner, flush_task })
    }

    /// Upload pending counts now.
    pub async fn flush(&self) -> Result<()> {
        self.inner.flush().await
    }

    /// Evaluation counts that have not been uploaded yet.
    pub fn pending(&self) -> HashMap<String, u64> {
        lock(&self.inner.counts).clone()
    }
}

impl AnalyticsCollector for FlagAnalytics {
    fn track_event(&self, feature_name: &str) {
        let mut counts = lock(&self.inner.counts);
        *counts.entry(feature_name.to_owned()).or_insert(0) += 1;
    }
}

impl Drop for FlagAnalytics {
    fn drop(&mut self) {
        self.flush_task.abort();
        self.inner.store.save(&lock(&self.inner.counts));
    }
}

impl AnalyticsInner {
    async fn flush(&self) -> Result<()> {
        let snapshot = lock(&self.counts).clone();
        if snapshot.is_empty() {
            return Ok(());
        }
        // Persist first so a failed upload is not lost on restart.
        self.store.save(&snapshot);

        log::debug!(target: "flagsmith", features = snapshot.len(); "uploading analytics");
        self.dispatcher
            .execute_discarding(
                &Request::PostAnalytics {
                    counts: snapshot.clone(),
                },
                self.timeout,
            )
            .await?;

        // Events tracked during the upload stay pending.
        let mut counts = lock(&self.counts);
        for (feature, uploaded) in snapshot {
            if let Some(count) = counts.get_mut(&feature) {
                *count = count.saturating_sub(uploaded);
                if *count == 0 {
                    counts.remove(&feature);
                }
            }
        }
        self.store.save(&counts);

        Ok(())
    }
}

/// Counters stay usable even if a thread panicked while holding the lock.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Apply a random jitter to `interval`.
fn jitter(interval: Duration, jitter: Duration) -> Duration {
    if jitter.is_zero() {
        return interval;
    }
    interval + thread_rng().gen_range(Duration::ZERO..jitter)
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use super::{jitter, AnalyticsCollector, AnalyticsStore, FlagAnalytics, MemoryAnalyticsStore};
    use crate::{dispatcher::Dispatcher, Error};

    fn dispatcher() -> Dispatcher {
        // Nothing listens here; flush is never reached in these tests.
        Dispatcher::new("http://127.0.0.1:9".to_owned(), "env-key".to_owned())
    }

    #[test]
    fn closure_can_be_a_collector() {
        let seen = Mutex::new(Vec::new());
        let collector = |name: &str| seen.lock().unwrap().push(name.to_owned());
        collector.track_event("a");
        collector.track_event("b");
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let interval = Duration::from_secs(10);
        for _ in 0..100 {
            let value = jitter(interval, Duration::from_secs(1));
            assert!(value >= interval && value < interval + Duration::from_secs(1));
        }
        assert_eq!(jitter(interval, Duration::ZERO), interval);
    }

    #[test]
    fn requires_runtime() {
        let result = FlagAnalytics::start(
            dispatcher(),
            Arc::new(MemoryAnalyticsStore::new()),
            Duration::from_secs(10),
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn counts_evaluations_and_persists_them() {
        let store = Arc::new(MemoryAnalyticsStore::new());
        let analytics = FlagAnalytics::start(
            dispatcher(),
            store.clone(),
            Duration::from_secs(3600),
            Duration::from_secs(1),
        )
        .unwrap();

        analytics.track_event("banner");
        analytics.track_event("banner");
        analytics.track_event("beta");

        let expected = HashMap::from([("banner".to_owned(), 2), ("beta".to_owned(), 1)]);
        assert_eq!(analytics.pending(), expected);
        // Evaluations don't write to the store.
        assert!(store.load().is_empty());

        drop(analytics);
        assert_eq!(store.load(), expected);
    }

    #[tokio::test]
    async fn restores_counts_from_store() {
        let store = Arc::new(MemoryAnalyticsStore::new());
        store.save(&HashMap::from([("banner".to_owned(), 5)]));

        let analytics = FlagAnalytics::start(
            dispatcher(),
            store,
            Duration::from_secs(3600),
            Duration::from_secs(1),
        )
        .unwrap();
        analytics.track_event("banner");

        assert_eq!(analytics.pending().get("banner"), Some(&6));
    }

    #[tokio::test]
    async fn flush_without_events_does_not_send() {
        let analytics = FlagAnalytics::start(
            dispatcher(),
            Arc::new(MemoryAnalyticsStore::new()),
            Duration::from_secs(3600),
            Duration::from_secs(1),
        )
        .unwrap();

        assert!(analytics.flush().await.is_ok());
    }
}
