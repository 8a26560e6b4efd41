//! OpenTelemetry-backed implementation of the client's meter interface
//!
//! Wraps OpenTelemetry counter and histogram instruments behind the
//! [`Meter`], [`Counter`] and [`ValueRecorder`] capability traits. One
//! instrument is created per unique (name, tag mapping) pair and cached
//! for the adapter's lifetime; the set of pairs the client emits is
//! finite, so the cache is never evicted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use opentelemetry::metrics::{Counter as OtelCounter, Histogram, Meter as OtelMeter, MeterProvider};
use opentelemetry::KeyValue;
use tracing::warn;

use crate::api::{Counter, Meter, ValueRecorder};
use crate::error::{InstrumentError, InstrumentResult};

const INSTRUMENT_NAME_MAX_LENGTH: usize = 255;

/// Largest counter/recorder value that survives the signed 64-bit wire
/// representation of metric points.
const MAX_SIGNED: u64 = i64::MAX as u64;

/// An implementation of the client's `Meter` interface which wraps an
/// OpenTelemetry meter.
///
/// # Example
///
/// ```rust,ignore
/// use couchbase_opentelemetry::{Meter as _, OpenTelemetryMeter};
///
/// let meter = OpenTelemetryMeter::new(&meter_provider);
/// let counter = meter.counter("db.couchbase.operations", &tags)?;
/// counter.increment_by(1);
/// ```
pub struct OpenTelemetryMeter {
    wrapped: OtelMeter,
    cache: Mutex<InstrumentCaches>,
}

#[derive(Default)]
struct InstrumentCaches {
    counters: HashMap<String, Arc<OpenTelemetryCounter>>,
    recorders: HashMap<String, Arc<OpenTelemetryValueRecorder>>,
}

impl OpenTelemetryMeter {
    /// Creates a new `OpenTelemetryMeter` from a meter provider.
    pub fn new<P>(provider: &P) -> Self
    where
        P: MeterProvider,
    {
        Self {
            wrapped: provider.meter(crate::INSTRUMENTATION_SCOPE),
            cache: Mutex::new(InstrumentCaches::default()),
        }
    }
}

impl Meter for OpenTelemetryMeter {
    fn counter(
        &self,
        name: &str,
        tags: &HashMap<String, String>,
    ) -> InstrumentResult<Arc<dyn Counter>> {
        let key = instrument_key(name, tags);
        let mut caches = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(counter) = caches.counters.get(&key) {
            return Ok(Arc::clone(counter) as Arc<dyn Counter>);
        }

        validate_instrument_name(name)?;
        let wrapped = self.wrapped.u64_counter(name.to_owned()).build();
        let counter = Arc::new(OpenTelemetryCounter {
            name: name.to_owned(),
            wrapped,
            attributes: counter_attributes(tags),
        });
        caches.counters.insert(key, Arc::clone(&counter));
        Ok(counter)
    }

    fn value_recorder(
        &self,
        name: &str,
        tags: &HashMap<String, String>,
    ) -> InstrumentResult<Arc<dyn ValueRecorder>> {
        let key = instrument_key(name, tags);
        let mut caches = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(recorder) = caches.recorders.get(&key) {
            return Ok(Arc::clone(recorder) as Arc<dyn ValueRecorder>);
        }

        validate_instrument_name(name)?;
        let wrapped = self.wrapped.u64_histogram(name.to_owned()).build();
        let recorder = Arc::new(OpenTelemetryValueRecorder {
            name: name.to_owned(),
            wrapped,
            attributes: tag_attributes(tags),
        });
        caches.recorders.insert(key, Arc::clone(&recorder));
        Ok(recorder)
    }
}

struct OpenTelemetryCounter {
    name: String,
    wrapped: OtelCounter<u64>,
    attributes: Vec<KeyValue>,
}

impl Counter for OpenTelemetryCounter {
    fn increment_by(&self, amount: u64) {
        self.wrapped
            .add(clamp_to_signed(amount, &self.name), &self.attributes);
    }
}

struct OpenTelemetryValueRecorder {
    name: String,
    wrapped: Histogram<u64>,
    attributes: Vec<KeyValue>,
}

impl ValueRecorder for OpenTelemetryValueRecorder {
    fn record_value(&self, value: u64) {
        // a zero reading means "nothing to report" and is never recorded
        if value == 0 {
            return;
        }
        self.wrapped
            .record(clamp_to_signed(value, &self.name), &self.attributes);
    }
}

/// Cache key covering the instrument name and the full tag mapping.
///
/// Tag pairs are sorted so two mappings with the same entries produce the
/// same key regardless of iteration order; the control-character
/// separators keep tag boundaries from colliding with tag text.
fn instrument_key(name: &str, tags: &HashMap<String, String>) -> String {
    let mut pairs: Vec<_> = tags.iter().collect();
    pairs.sort_unstable();

    let mut key = String::with_capacity(name.len() + tags.len() * 16);
    key.push_str(name);
    for (tag, value) in pairs {
        key.push('\u{1f}');
        key.push_str(tag);
        key.push('\u{1e}');
        key.push_str(value);
    }
    key
}

fn tag_attributes(tags: &HashMap<String, String>) -> Vec<KeyValue> {
    tags.iter()
        .map(|(tag, value)| KeyValue::new(tag.clone(), value.clone()))
        .collect()
}

/// Counters carry the client's fixed `system` attribute on top of the
/// caller's tags.
fn counter_attributes(tags: &HashMap<String, String>) -> Vec<KeyValue> {
    let mut attributes = tag_attributes(tags);
    attributes.push(KeyValue::new("system", "couchbase"));
    attributes
}

/// The instrument name rules the SDK enforces. The Rust SDK logs and
/// substitutes a no-op instrument instead of reporting the rejection, so
/// the check runs here first and the caller gets an error value back.
fn validate_instrument_name(name: &str) -> InstrumentResult<()> {
    if name.is_empty() {
        return Err(InstrumentError::invalid_instrument_name(
            name,
            "name is empty",
        ));
    }
    if name.len() > INSTRUMENT_NAME_MAX_LENGTH {
        return Err(InstrumentError::invalid_instrument_name(
            name,
            "name is longer than 255 characters",
        ));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(InstrumentError::invalid_instrument_name(
            name,
            "name must start with an ASCII letter",
        ));
    }
    if name.contains(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/'))) {
        return Err(InstrumentError::invalid_instrument_name(
            name,
            "name contains characters outside [A-Za-z0-9_.-/]",
        ));
    }
    Ok(())
}

fn clamp_to_signed(value: u64, instrument: &str) -> u64 {
    if value > MAX_SIGNED {
        warn!(
            instrument,
            value, "metric value exceeds the signed 64-bit range, clamping to i64::MAX"
        );
        return MAX_SIGNED;
    }
    value
}
