//! Metric names and [`Metrics`] sinks.

use std::{
    net::UdpSocket,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use cadence::{
    BufferedUdpMetricSink, CountedExt, MetricResult, QueuingMetricSink, StatsdClient, Timed,
};
use rpcgate_traits::Metrics;

// ── Metric name constants ────────────────────────────────────

/// Counter incremented once per call attempt.
pub const CALL: &str = "xmlrpc.call";
/// Timing of the full pipeline, rejected calls included.
pub const TIMING: &str = "xmlrpc.timing";
/// Counter incremented when a call is admitted by the rate limiter.
pub const RATELIMITER_HIT: &str = "xmlrpc.ratelimiter.hit";
/// Counter incremented when a call is rejected by the rate limiter.
pub const RATELIMITER_EXCEEDED: &str = "xmlrpc.ratelimiter.exceeded";
/// Tag key carrying the method name.
pub const METHOD_TAG: &str = "rpc_method";

// ── StatsD sink ─────────────────────────────────────────────

/// [`Metrics`] sink backed by a [`cadence::StatsdClient`].
#[derive(Clone, Debug)]
pub struct StatsdMetrics {
    inner: Arc<StatsdClient>,
}

impl StatsdMetrics {
    /// Create a sink sending to the `StatsD` agent at `host:port`, prefixing
    /// every metric name with `prefix`.
    pub fn new(host: &str, port: u16, prefix: &str) -> MetricResult<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        let addr = format!("{host}:{port}");
        let udp_sink = BufferedUdpMetricSink::from(addr.as_str(), socket)?;
        let queuing_sink = QueuingMetricSink::from(udp_sink);
        let client = StatsdClient::from_sink(prefix, queuing_sink);
        Ok(Self { inner: Arc::new(client) })
    }

    /// Create a sink that silently drops every metric.
    pub fn noop() -> Self {
        Self { inner: Arc::new(StatsdClient::from_sink("", cadence::NopMetricSink)) }
    }
}

impl Metrics for StatsdMetrics {
    fn increment(&self, name: &str, tags: &[(&str, &str)]) {
        let mut builder = self.inner.incr_with_tags(name);
        for &(k, v) in tags {
            builder = builder.with_tag(k, v);
        }
        builder.send();
    }

    fn timing(&self, name: &str, elapsed: Duration, tags: &[(&str, &str)]) {
        let mut builder = self.inner.time_with_tags(name, elapsed);
        for &(k, v) in tags {
            builder = builder.with_tag(k, v);
        }
        builder.send();
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn increment(&self, _name: &str, _tags: &[(&str, &str)]) {}

    fn timing(&self, _name: &str, _elapsed: Duration, _tags: &[(&str, &str)]) {}
}

// ── In-memory recorder ──────────────────────────────────────

/// A metric emitted to a [`RecordingMetrics`] sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricEvent {
    /// A counter increment.
    Increment {
        /// Metric name.
        name: String,
        /// Tags rendered `key:value`.
        tags: Vec<String>,
    },
    /// A timing.
    Timing {
        /// Metric name.
        name: String,
        /// Measured duration.
        elapsed: Duration,
        /// Tags rendered `key:value`.
        tags: Vec<String>,
    },
}

impl MetricEvent {
    /// Metric name.
    pub fn name(&self) -> &str {
        match self {
            Self::Increment { name, .. } | Self::Timing { name, .. } => name,
        }
    }

    /// Rendered tags.
    pub fn tags(&self) -> &[String] {
        match self {
            Self::Increment { tags, .. } | Self::Timing { tags, .. } => tags,
        }
    }
}

/// Sink keeping every event in memory, for inspection.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    events: Mutex<Vec<MetricEvent>>,
}

impl RecordingMetrics {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded event.
    pub fn events(&self) -> Vec<MetricEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of increments of `name`.
    pub fn count(&self, name: &str) -> usize {
        self.matching(|event| matches!(event, MetricEvent::Increment { .. }) && event.name() == name)
    }

    /// Number of increments of `name` carrying the `key:value` tag.
    pub fn count_tagged(&self, name: &str, tag: &str) -> usize {
        self.matching(|event| {
            matches!(event, MetricEvent::Increment { .. })
                && event.name() == name
                && event.tags().iter().any(|t| t == tag)
        })
    }

    /// Number of timings recorded under `name`.
    pub fn timings(&self, name: &str) -> usize {
        self.matching(|event| matches!(event, MetricEvent::Timing { .. }) && event.name() == name)
    }

    fn matching(&self, predicate: impl Fn(&MetricEvent) -> bool) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).iter().filter(|e| predicate(e)).count()
    }

    fn push(&self, event: MetricEvent) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }
}

fn render(tags: &[(&str, &str)]) -> Vec<String> {
    tags.iter().map(|(k, v)| format!("{k}:{v}")).collect()
}

impl Metrics for RecordingMetrics {
    fn increment(&self, name: &str, tags: &[(&str, &str)]) {
        self.push(MetricEvent::Increment { name: name.to_string(), tags: render(tags) });
    }

    fn timing(&self, name: &str, elapsed: Duration, tags: &[(&str, &str)]) {
        self.push(MetricEvent::Timing { name: name.to_string(), elapsed, tags: render(tags) });
    }
}
