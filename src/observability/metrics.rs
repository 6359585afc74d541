//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Own every counter and gauge series of the process
//! - Render a deterministic Prometheus text snapshot for `/metrics`
//! - Act as a `metrics::Recorder` so facade handles land in the same series
//!
//! # Design Decisions
//! - One `AtomicU64` per series: updates and reads never tear
//! - Label sets are sorted by key before lookup
//! - Explicitly constructed and passed around, never installed globally

use std::collections::BTreeMap;
use std::fmt::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
};

/// Content type of the text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Normalized label set identifying one series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelSet(Vec<(String, String)>);

impl LabelSet {
    /// Build a label set; order of the input pairs does not matter.
    ///
    /// A key given twice keeps its last value.
    pub fn new<I, K, V>(labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for (k, v) in labels {
            let k = k.into();
            let v = v.into();
            match pairs.iter_mut().find(|(existing, _)| *existing == k) {
                Some(slot) => slot.1 = v,
                None => pairs.push((k, v)),
            }
        }
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        Self(pairs)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    name: String,
    labels: LabelSet,
}

impl SeriesKey {
    fn new(name: &str, labels: LabelSet) -> Self {
        Self {
            name: name.to_string(),
            labels,
        }
    }

    fn from_metrics_key(key: &Key) -> Self {
        let labels = LabelSet::new(key.labels().map(|l| (l.key(), l.value())));
        Self::new(key.name(), labels)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MetricKind {
    Counter,
    Gauge,
}

impl MetricKind {
    fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    counters: DashMap<SeriesKey, Arc<AtomicU64>>,
    /// Gauge values stored as `f64` bit patterns.
    gauges: DashMap<SeriesKey, Arc<AtomicU64>>,
    help: DashMap<String, String>,
}

/// Process-wide store of counters and gauges.
///
/// Cloning is cheap and every clone shares the same series.
#[derive(Debug, Clone, Default)]
pub struct MetricsRegistry {
    inner: Arc<Inner>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `# HELP` text to a metric family.
    pub fn describe(&self, name: &str, help: &str) {
        self.inner.help.insert(name.to_string(), help.to_string());
    }

    /// Add one to the series `name{labels}`, creating it at zero first if needed.
    pub fn increment_counter<K, V>(&self, name: &str, labels: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.counter_cell(SeriesKey::new(name, LabelSet::new(labels)))
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Overwrite the unlabeled gauge `name`.
    pub fn set_gauge(&self, name: &str, value: f64) {
        self.gauge_cell(SeriesKey::new(name, LabelSet::default()))
            .store(value.to_bits(), Ordering::Relaxed);
    }

    /// Current value of a counter series, if it was ever observed.
    pub fn counter_value<K, V>(
        &self,
        name: &str,
        labels: impl IntoIterator<Item = (K, V)>,
    ) -> Option<u64>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let key = SeriesKey::new(name, LabelSet::new(labels));
        self.inner
            .counters
            .get(&key)
            .map(|cell| cell.load(Ordering::Relaxed))
    }

    /// Current value of an unlabeled gauge, if it was ever set.
    pub fn gauge_value(&self, name: &str) -> Option<f64> {
        let key = SeriesKey::new(name, LabelSet::default());
        self.inner
            .gauges
            .get(&key)
            .map(|cell| f64::from_bits(cell.load(Ordering::Relaxed)))
    }

    /// Render every series in the text exposition format.
    ///
    /// Families are ordered by name and series by label set, so two calls
    /// without intervening writes return identical text.
    pub fn export(&self) -> Result<String, fmt::Error> {
        let mut families: BTreeMap<(String, MetricKind), BTreeMap<LabelSet, String>> =
            BTreeMap::new();

        for entry in self.inner.counters.iter() {
            let value = entry.value().load(Ordering::Relaxed);
            families
                .entry((entry.key().name.clone(), MetricKind::Counter))
                .or_default()
                .insert(entry.key().labels.clone(), value.to_string());
        }
        for entry in self.inner.gauges.iter() {
            let value = f64::from_bits(entry.value().load(Ordering::Relaxed));
            families
                .entry((entry.key().name.clone(), MetricKind::Gauge))
                .or_default()
                .insert(entry.key().labels.clone(), format_float(value));
        }

        let mut out = String::new();
        for ((name, kind), series) in families {
            if let Some(help) = self.inner.help.get(&name) {
                writeln!(out, "# HELP {} {}", name, escape_help(help.value()))?;
            }
            writeln!(out, "# TYPE {} {}", name, kind.as_str())?;
            for (labels, value) in series {
                write_series(&mut out, &name, &labels, &value)?;
            }
        }
        Ok(out)
    }

    fn counter_cell(&self, key: SeriesKey) -> Arc<AtomicU64> {
        if let Some(cell) = self.inner.counters.get(&key) {
            return cell.clone();
        }
        self.inner.counters.entry(key).or_default().clone()
    }

    fn gauge_cell(&self, key: SeriesKey) -> Arc<AtomicU64> {
        if let Some(cell) = self.inner.gauges.get(&key) {
            return cell.clone();
        }
        self.inner.gauges.entry(key).or_default().clone()
    }
}

impl Recorder for MetricsRegistry {
    fn describe_counter(&self, key: KeyName, _unit: Option<Unit>, description: SharedString) {
        self.describe(key.as_str(), &description);
    }

    fn describe_gauge(&self, key: KeyName, _unit: Option<Unit>, description: SharedString) {
        self.describe(key.as_str(), &description);
    }

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(self.counter_cell(SeriesKey::from_metrics_key(key)))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(self.gauge_cell(SeriesKey::from_metrics_key(key)))
    }

    // Histograms are not exported by this registry.
    fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

fn write_series(out: &mut String, name: &str, labels: &LabelSet, value: &str) -> fmt::Result {
    out.push_str(name);
    if !labels.is_empty() {
        out.push('{');
        for (i, (k, v)) in labels.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write!(out, "{}=\"{}\"", k, escape_label_value(v))?;
        }
        out.push('}');
    }
    writeln!(out, " {}", value)
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}
