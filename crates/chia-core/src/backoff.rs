use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Per-identity exponential requeue delay: `base * 2^(failures-1)`, capped at `max`.
pub struct Backoff {
    base: Duration,
    max: Duration,
    failures: Mutex<HashMap<String, u32>>,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failure for `identity` and return how long to wait before retrying.
    pub fn next_delay(&self, identity: &str) -> Duration {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        let count = failures.entry(identity.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        let exponent = (*count - 1).min(20);
        self.base.saturating_mul(1u32 << exponent).min(self.max)
    }

    /// Forget failures after a successful pass.
    pub fn reset(&self, identity: &str) {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        failures.remove(identity);
    }
}
