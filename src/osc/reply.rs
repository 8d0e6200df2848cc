//! Echo bookkeeping for outbound OSC writes
//!
//! Every outbound fader write is remembered as a (timestamp, value) entry.
//! When feedback arrives, a matching entry identifies it as the echo of our
//! own write. Entries expire after a fixed age and are pruned before any
//! lookup; a matched entry is consumed so it can answer only once.

use std::time::Duration;
use tokio::time::Instant;

/// Default entry lifetime
const MAX_AGE: Duration = Duration::from_secs(1);
/// Default float comparison tolerance
const EPSILON: f32 = 1e-4;

/// Time-bounded set of outbound writes awaiting their echo.
pub struct ReplyWindow {
    entries: Vec<(Instant, f32)>,
    max_age: Duration,
    epsilon: f32,
}

impl ReplyWindow {
    pub fn new() -> Self {
        Self::with_limits(MAX_AGE, EPSILON)
    }

    pub fn with_limits(max_age: Duration, epsilon: f32) -> Self {
        Self {
            entries: Vec::new(),
            max_age,
            epsilon,
        }
    }

    /// Remember an outbound write.
    pub fn record(&mut self, value: f32) {
        self.entries.push((Instant::now(), value));
    }

    /// Check whether `value` echoes a recorded write. Expired entries are
    /// pruned first; a hit removes the matched entry.
    pub fn consume(&mut self, value: f32) -> bool {
        let now = Instant::now();
        self.entries.retain(|(at, _)| now - *at < self.max_age);

        match self
            .entries
            .iter()
            .position(|(_, sent)| (sent - value).abs() < self.epsilon)
        {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }
}

impl Default for ReplyWindow {
    fn default() -> Self {
        Self::new()
    }
}
