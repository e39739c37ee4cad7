//! Metrics sink trait and a scoped timer.

use std::time::{Duration, Instant};

/// Tagged counter and timing sink.
///
/// Tags are `(key, value)` pairs, rendered `key:value` by statsd backends.
pub trait Metrics: Send + Sync + 'static {
    /// Increment a counter by one.
    fn increment(&self, name: &str, tags: &[(&str, &str)]);

    /// Record an elapsed duration.
    fn timing(&self, name: &str, elapsed: Duration, tags: &[(&str, &str)]);
}

impl dyn Metrics {
    /// Start a timer that records under `name` when dropped.
    pub fn timed(&self, name: &str, tags: &[(&str, &str)]) -> Timer<'_> {
        Timer::start(self, name, tags)
    }
}

/// Records the time between its creation and drop.
#[must_use = "the timer records when it is dropped"]
pub struct Timer<'a> {
    sink: &'a dyn Metrics,
    name: String,
    tags: Vec<(String, String)>,
    started: Instant,
}

impl<'a> Timer<'a> {
    /// Start timing against `sink`.
    pub fn start(sink: &'a dyn Metrics, name: &str, tags: &[(&str, &str)]) -> Self {
        Self {
            sink,
            name: name.to_string(),
            tags: tags.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect(),
            started: Instant::now(),
        }
    }

    /// Time elapsed so far.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        let tags: Vec<(&str, &str)> =
            self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        self.sink.timing(&self.name, self.started.elapsed(), &tags);
    }
}

impl std::fmt::Debug for Timer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer").field("name", &self.name).field("tags", &self.tags).finish()
    }
}
