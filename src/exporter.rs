//! Prometheus text exporter for statistics snapshots.
//!
//! Writes in the Prometheus text exposition format so snapshots can be
//! scraped directly or forwarded to an OpenTelemetry collector. The JSON
//! report (`StatsSnapshot::to_json`) remains the primary observability
//! surface; this exporter exists for hosts that already speak Prometheus.

use std::io::Write;

use parking_lot::Mutex;

use crate::engine::stats::StatsSnapshot;

/// Writes [`StatsSnapshot`]s as Prometheus text exposition.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> PrometheusTextExporter<W> {
    /// Creates an exporter that prefixes every metric name with `prefix`
    /// (joined by `_`; an empty prefix emits bare names).
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Writes one snapshot: the monotonic counters as `*_total` counters
    /// and `size` / `max_size` / `hit_rate` as gauges. `max_size` is
    /// omitted for an unbounded cache.
    pub fn export(&self, snapshot: &StatsSnapshot) {
        let mut writer = self.writer.lock();
        let mut counter = |name: &str, value: u64| {
            let name = self.metric_name(name);
            let _ = writeln!(writer, "# TYPE {} counter", name);
            let _ = writeln!(writer, "{} {}", name, value);
        };
        counter("hits_total", snapshot.hits);
        counter("misses_total", snapshot.misses);
        counter("sets_total", snapshot.sets);
        counter("deletes_total", snapshot.deletes);
        counter("evictions_total", snapshot.evictions);
        counter("expirations_total", snapshot.expirations);

        let mut gauge = |name: &str, value: String| {
            let name = self.metric_name(name);
            let _ = writeln!(writer, "# TYPE {} gauge", name);
            let _ = writeln!(writer, "{} {}", name, value);
        };
        gauge("size", snapshot.size.to_string());
        if let Some(max) = snapshot.max_size {
            gauge("max_size", max.to_string());
        }
        gauge("hit_rate", snapshot.hit_rate.to_string());
    }

    /// Consumes the exporter and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}
