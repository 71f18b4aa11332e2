//! Thread-safe usage tracker.

use crate::model::UsageStat;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Per-provider usage statistics behind a single narrow lock.
///
/// The lock is held only for the arithmetic of one update or one copy, never
/// across an await point.
#[derive(Debug, Default)]
pub struct UsageTracker {
    stats: Mutex<HashMap<String, UsageStat>>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the entry for `provider` if missing. Existing stats are kept.
    pub fn seed(&self, provider: &str) {
        self.stats
            .lock()
            .entry(provider.to_string())
            .or_insert_with(|| UsageStat::seeded(provider));
    }

    /// Record one completed request.
    pub fn record(&self, provider: &str, model: &str, success: bool, elapsed: Duration, tokens: u32) {
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let mut stats = self.stats.lock();
        let stat = stats
            .entry(provider.to_string())
            .or_insert_with(|| UsageStat::seeded(provider));
        stat.observe(model, success, elapsed_ms, tokens);

        tracing::debug!(
            provider = %provider,
            model = %model,
            success,
            requests = stat.request_count,
            success_rate = stat.success_rate,
            "Usage recorded"
        );
    }

    /// Copy of one provider's stats.
    pub fn get(&self, provider: &str) -> Option<UsageStat> {
        self.stats.lock().get(provider).cloned()
    }

    /// Copy of every provider's stats, keyed by provider id.
    pub fn snapshot(&self) -> BTreeMap<String, UsageStat> {
        self.stats
            .lock()
            .iter()
            .map(|(id, stat)| (id.clone(), stat.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn seed_is_idempotent() {
        let tracker = UsageTracker::new();
        tracker.seed("openai");
        tracker.record("openai", "gpt-4o-mini", true, ms(100), 50);
        tracker.seed("openai");

        let stat = tracker.get("openai").unwrap();
        assert_eq!(stat.request_count, 1);
        assert_eq!(stat.tokens_used, 50);
    }

    #[test]
    fn success_rate_running_mean() {
        let tracker = UsageTracker::new();
        tracker.seed("openai");
        for success in [true, true, false, true] {
            tracker.record("openai", "gpt-4o-mini", success, ms(100), 10);
        }

        let stat = tracker.get("openai").unwrap();
        assert_eq!(stat.request_count, 4);
        assert!((stat.success_rate - 0.75).abs() < 1e-9);
        assert_eq!(stat.tokens_used, 40);
        assert!(stat.last_used.is_some());
    }

    #[test]
    fn response_time_running_mean() {
        let tracker = UsageTracker::new();
        tracker.record("ollama", "llama3.1", true, ms(100), 0);
        tracker.record("ollama", "llama3.1", true, ms(300), 0);
        tracker.record("ollama", "llama3.1", true, ms(200), 0);

        let stat = tracker.get("ollama").unwrap();
        assert!((stat.avg_response_time_ms - 200.0).abs() < 1e-6);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let tracker = UsageTracker::new();
        tracker.seed("b");
        tracker.seed("a");

        let snap = tracker.snapshot();
        tracker.record("a", "m", false, ms(1), 0);

        assert_eq!(snap.keys().cloned().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(snap["a"].request_count, 0);
        assert_eq!(tracker.get("a").unwrap().request_count, 1);
    }

    #[test]
    fn unknown_provider_has_no_stats() {
        assert!(UsageTracker::new().get("nope").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_records_are_not_lost() {
        let tracker = Arc::new(UsageTracker::new());
        tracker.seed("openai");

        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    tracker.record("openai", "gpt-4o", i % 5 != 0, ms(10), 2);
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let stat = tracker.get("openai").unwrap();
        assert_eq!(stat.request_count, 50);
        assert_eq!(stat.tokens_used, 100);
        assert!((stat.success_rate - 0.8).abs() < 1e-9);
    }
}
