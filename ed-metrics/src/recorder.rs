//! A `metrics::Recorder` that collects into an in-memory [`RunMetrics`].
//!
//! Model code emits standard `metrics` counters, gauges and histograms; a
//! harness installs the recorder for the duration of one run and reads the
//! values back afterwards. The recorder is installed locally, so parallel
//! tests and consecutive runs never share state:
//!
//! ```rust
//! # use std::sync::{Arc, Mutex};
//! # use edsim_metrics::{with_run_metrics_recorder, RunMetrics};
//! let metrics = Arc::new(Mutex::new(RunMetrics::new()));
//! with_run_metrics_recorder(&metrics, || {
//!     metrics::counter!("patients_total", "type" => "Type 1").increment(1);
//!     metrics::histogram!("time_in_system", "type" => "Type 1").record(41.5);
//! });
//!
//! let metrics = metrics.lock().unwrap();
//! assert_eq!(metrics.counter("patients_total", &[("type", "Type 1")]), Some(1));
//! assert_eq!(metrics.histogram("time_in_system", &[("type", "Type 1")]).unwrap().len(), 1);
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use tracing::warn;

use crate::histogram::TimeHistogram;

/// Metric name plus its labels, sorted by label key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricKey {
    pub name: String,
    pub labels: Vec<(String, String)>,
}

impl MetricKey {
    pub fn new(name: &str, labels: &[(&str, &str)]) -> Self {
        Self::from_owned(
            name.to_string(),
            labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn from_owned(name: String, mut labels: Vec<(String, String)>) -> Self {
        labels.sort();
        Self { name, labels }
    }

    fn from_key(key: &Key) -> Self {
        Self::from_owned(
            key.name().to_string(),
            key.labels()
                .map(|l| (l.key().to_string(), l.value().to_string()))
                .collect(),
        )
    }
}

/// Values collected during one run.
#[derive(Debug, Default)]
pub struct RunMetrics {
    counters: BTreeMap<MetricKey, u64>,
    gauges: BTreeMap<MetricKey, f64>,
    histograms: BTreeMap<MetricKey, TimeHistogram>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        self.counters.get(&MetricKey::new(name, labels)).copied()
    }

    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.gauges.get(&MetricKey::new(name, labels)).copied()
    }

    pub fn histogram(&self, name: &str, labels: &[(&str, &str)]) -> Option<&TimeHistogram> {
        self.histograms.get(&MetricKey::new(name, labels))
    }

    /// Every histogram registered under `name`, whatever its labels.
    pub fn histograms_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = (&'a MetricKey, &'a TimeHistogram)> + 'a {
        self.histograms.iter().filter(move |(key, _)| key.name == name)
    }

    fn add_counter(&mut self, key: &MetricKey, value: u64) {
        *self.counters.entry(key.clone()).or_default() += value;
    }

    fn set_counter(&mut self, key: &MetricKey, value: u64) {
        self.counters.insert(key.clone(), value);
    }

    fn add_gauge(&mut self, key: &MetricKey, delta: f64) {
        *self.gauges.entry(key.clone()).or_default() += delta;
    }

    fn set_gauge(&mut self, key: &MetricKey, value: f64) {
        self.gauges.insert(key.clone(), value);
    }

    fn record_histogram(&mut self, key: &MetricKey, value: f64) {
        if !self.histograms.contains_key(key) {
            match TimeHistogram::new() {
                Ok(hist) => {
                    self.histograms.insert(key.clone(), hist);
                }
                Err(e) => {
                    warn!(metric = %key.name, error = %e, "Dropping histogram sample");
                    return;
                }
            }
        }
        if let Some(hist) = self.histograms.get_mut(key) {
            if let Err(e) = hist.record(value) {
                warn!(metric = %key.name, error = %e, "Dropping histogram sample");
            }
        }
    }
}

/// Run `f` with a recorder feeding `metrics` installed for the current thread.
pub fn with_run_metrics_recorder<T>(metrics: &Arc<Mutex<RunMetrics>>, f: impl FnOnce() -> T) -> T {
    let recorder = RunRecorder::new(Arc::clone(metrics));
    metrics::with_local_recorder(&recorder, f)
}

/// Recorder handing every update to a shared [`RunMetrics`].
#[derive(Clone)]
pub struct RunRecorder {
    metrics: Arc<Mutex<RunMetrics>>,
}

impl RunRecorder {
    pub fn new(metrics: Arc<Mutex<RunMetrics>>) -> Self {
        Self { metrics }
    }

    fn handle(&self, key: &Key) -> Arc<Handle> {
        Arc::new(Handle {
            metrics: Arc::clone(&self.metrics),
            key: MetricKey::from_key(key),
        })
    }
}

struct Handle {
    metrics: Arc<Mutex<RunMetrics>>,
    key: MetricKey,
}

impl Handle {
    // A panic elsewhere must not take metric collection down with it.
    fn lock(&self) -> MutexGuard<'_, RunMetrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl metrics::CounterFn for Handle {
    fn increment(&self, value: u64) {
        self.lock().add_counter(&self.key, value);
    }

    fn absolute(&self, value: u64) {
        self.lock().set_counter(&self.key, value);
    }
}

impl metrics::GaugeFn for Handle {
    fn increment(&self, value: f64) {
        self.lock().add_gauge(&self.key, value);
    }

    fn decrement(&self, value: f64) {
        self.lock().add_gauge(&self.key, -value);
    }

    fn set(&self, value: f64) {
        self.lock().set_gauge(&self.key, value);
    }
}

impl metrics::HistogramFn for Handle {
    fn record(&self, value: f64) {
        self.lock().record_histogram(&self.key, value);
    }
}

impl Recorder for RunRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(self.handle(key))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(self.handle(key))
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(self.handle(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_captures_macros() {
        let metrics = Arc::new(Mutex::new(RunMetrics::new()));

        with_run_metrics_recorder(&metrics, || {
            metrics::counter!("grants_total", "resource" => "x_ray", "kind" => "first").increment(2);
            metrics::counter!("grants_total", "resource" => "x_ray", "kind" => "first").increment(1);
            metrics::gauge!("queue_len", "resource" => "plaster").set(4.0);
            metrics::gauge!("queue_len", "resource" => "plaster").decrement(1.0);
            metrics::histogram!("wait").record(2.5);
            metrics::histogram!("wait").record(-3.0);
        });

        let locked = metrics.lock().unwrap();
        // Label order does not matter for lookups.
        assert_eq!(
            locked.counter("grants_total", &[("kind", "first"), ("resource", "x_ray")]),
            Some(3)
        );
        assert_eq!(locked.gauge("queue_len", &[("resource", "plaster")]), Some(3.0));
        assert_eq!(locked.histogram("wait", &[]).unwrap().len(), 1);
        assert_eq!(locked.histograms_named("wait").count(), 1);
        assert_eq!(locked.counter("missing", &[]), None);
    }

    #[test]
    fn test_nothing_recorded_outside_scope() {
        let metrics = Arc::new(Mutex::new(RunMetrics::new()));
        metrics::counter!("outside").increment(1);
        with_run_metrics_recorder(&metrics, || {});
        assert_eq!(metrics.lock().unwrap().counter("outside", &[]), None);
    }
}
