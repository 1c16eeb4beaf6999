//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Counters cover relocation steps, outcomes, and delivered bytes.

use std::sync::Arc;
use std::time::Duration;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across invocations.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    relocation_steps_total: IntCounterVec,
    relocations_total: IntCounterVec,
    relocation_bytes_total: IntCounter,
    last_relocation_latency_ms: IntGauge,
}

/// Snapshot of selected counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Bytes written to destinations since process start.
    pub relocation_bytes_total: u64,
    /// Wall time of the most recent invocation in milliseconds.
    pub last_relocation_latency_ms: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests received"),
            &["route", "code"],
        )
        .map_err(|source| collector_error("http_requests_total", source))?;
        let relocation_steps_total = IntCounterVec::new(
            Opts::new(
                "relocation_steps_total",
                "Relocation pipeline steps executed by status",
            ),
            &["step", "status"],
        )
        .map_err(|source| collector_error("relocation_steps_total", source))?;
        let relocations_total = IntCounterVec::new(
            Opts::new("relocations_total", "Relocation invocations by outcome"),
            &["outcome"],
        )
        .map_err(|source| collector_error("relocations_total", source))?;
        let relocation_bytes_total = IntCounter::with_opts(Opts::new(
            "relocation_bytes_total",
            "Bytes written to relocation destinations",
        ))
        .map_err(|source| collector_error("relocation_bytes_total", source))?;
        let last_relocation_latency_ms = IntGauge::with_opts(Opts::new(
            "last_relocation_latency_ms",
            "Wall time of the most recent relocation invocation (ms)",
        ))
        .map_err(|source| collector_error("last_relocation_latency_ms", source))?;

        register(&registry, "http_requests_total", &http_requests_total)?;
        register(&registry, "relocation_steps_total", &relocation_steps_total)?;
        register(&registry, "relocations_total", &relocations_total)?;
        register(&registry, "relocation_bytes_total", &relocation_bytes_total)?;
        register(
            &registry,
            "last_relocation_latency_ms",
            &last_relocation_latency_ms,
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                relocation_steps_total,
                relocations_total,
                relocation_bytes_total,
                last_relocation_latency_ms,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Increment the relocation step counter.
    pub fn inc_relocation_step(&self, step: &str, status: &str) {
        self.inner
            .relocation_steps_total
            .with_label_values(&[step, status])
            .inc();
    }

    /// Record a finished invocation with its outcome label and wall time.
    pub fn observe_relocation(&self, outcome: &str, elapsed: Duration) {
        self.inner
            .relocations_total
            .with_label_values(&[outcome])
            .inc();
        self.inner
            .last_relocation_latency_ms
            .set(Self::duration_to_ms(elapsed));
    }

    /// Add delivered bytes.
    pub fn add_relocated_bytes(&self, bytes: u64) {
        self.inner.relocation_bytes_total.inc_by(bytes);
    }

    /// Read the outcome counter; used by health reporting and tests.
    #[must_use]
    pub fn relocations(&self, outcome: &str) -> u64 {
        self.inner
            .relocations_total
            .with_label_values(&[outcome])
            .get()
    }

    /// Read the step counter for one `(step, status)` pair.
    #[must_use]
    pub fn relocation_steps(&self, step: &str, status: &str) -> u64 {
        self.inner
            .relocation_steps_total
            .with_label_values(&[step, status])
            .get()
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            relocation_bytes_total: self.inner.relocation_bytes_total.get(),
            last_relocation_latency_ms: self.inner.last_relocation_latency_ms.get(),
        }
    }

    /// Convert a duration to milliseconds saturating at `i64::MAX`.
    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

const fn collector_error(name: &'static str, source: prometheus::Error) -> TelemetryError {
    TelemetryError::MetricsCollector { name, source }
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
