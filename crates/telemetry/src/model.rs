//! Data model for per-provider usage statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Running statistics for one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStat {
    pub provider: String,
    /// Model used by the most recent request.
    pub model: Option<String>,
    pub request_count: u64,
    pub tokens_used: u64,
    /// Running mean of successes, in [0, 1].
    pub success_rate: f64,
    /// Running mean response time in milliseconds.
    pub avg_response_time_ms: f64,
    pub last_used: Option<DateTime<Utc>>,
}

impl UsageStat {
    /// A fresh entry: no requests yet, success rate 1.0.
    pub fn seeded(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: None,
            request_count: 0,
            tokens_used: 0,
            success_rate: 1.0,
            avg_response_time_ms: 0.0,
            last_used: None,
        }
    }

    /// Fold one request into the running means.
    ///
    /// Each mean is updated as `(old * (n - 1) + sample) / n` with the new
    /// count `n`.
    pub(crate) fn observe(&mut self, model: &str, success: bool, elapsed_ms: f64, tokens: u32) {
        self.request_count += 1;
        let n = self.request_count as f64;
        let sample = if success { 1.0 } else { 0.0 };

        self.success_rate = (self.success_rate * (n - 1.0) + sample) / n;
        self.avg_response_time_ms = (self.avg_response_time_ms * (n - 1.0) + elapsed_ms) / n;
        self.tokens_used += u64::from(tokens);
        self.model = Some(model.to_string());
        self.last_used = Some(Utc::now());
    }
}
