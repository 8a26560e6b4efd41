//! The telemetry capability surface the Couchbase client programs against
//!
//! The client library never talks to a telemetry SDK directly. It emits
//! request spans and operation metrics through the traits in this module,
//! and an application plugs in concrete implementations (such as the
//! OpenTelemetry adapters in this crate) at connection setup.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::InstrumentResult;

/// An opaque handle associating a span with its surrounding context.
///
/// The client treats this as a pass-through token: it receives one from
/// [`RequestSpan::context`] and threads it back into
/// [`RequestTracer::request_span`] when creating child spans. The payload
/// is type-erased so that tracer implementations can carry whatever native
/// handle they need; implementations that do not recognize the payload
/// simply start a root span.
#[derive(Clone, Default)]
pub struct RequestSpanContext {
    payload: Option<Arc<dyn Any + Send + Sync>>,
}

impl RequestSpanContext {
    /// Wraps a native context handle.
    #[must_use]
    pub fn new<T>(payload: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            payload: Some(Arc::new(payload)),
        }
    }

    /// A context carrying no payload at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this context carries a payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_none()
    }

    /// Borrows the payload if it is of type `T`.
    #[must_use]
    pub fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: Any + Send + Sync,
    {
        self.payload
            .as_deref()
            .and_then(|payload| payload.downcast_ref::<T>())
    }
}

impl fmt::Debug for RequestSpanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.payload.is_some() {
            f.write_str("RequestSpanContext(..)")
        } else {
            f.write_str("RequestSpanContext(empty)")
        }
    }
}

/// A loosely-typed attribute value attached to a request span.
///
/// The client's instrumentation points hand over whatever value they have
/// on hand; the tracer implementation maps each variant to its own typed
/// representation. Values a tracer cannot interpret (the [`Opaque`]
/// variant) are dropped with a diagnostic rather than failing the
/// operation being instrumented.
///
/// [`Opaque`]: AttributeValue::Opaque
#[derive(Clone)]
pub enum AttributeValue {
    String(String),
    Bool(bool),
    Int(i32),
    Int64(i64),
    Float64(f64),
    StringSlice(Vec<String>),
    BoolSlice(Vec<bool>),
    IntSlice(Vec<i32>),
    Int64Slice(Vec<i64>),
    Float64Slice(Vec<f64>),
    /// A value with only a textual form; rendered via [`fmt::Display`].
    Stringer(Arc<dyn fmt::Display + Send + Sync>),
    /// An arbitrary payload the caller could not express any other way.
    Opaque(Arc<dyn Any + Send + Sync>),
    /// Produced by `None` optionals; carries nothing to record.
    Absent,
}

impl AttributeValue {
    /// Wraps a value that exposes a string conversion.
    pub fn stringer<T>(value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        Self::Stringer(Arc::new(value))
    }

    /// Wraps an arbitrary payload.
    pub fn opaque<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self::Opaque(Arc::new(value))
    }
}

impl fmt::Debug for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(v) => f.debug_tuple("String").field(v).finish(),
            Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Self::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Self::Int64(v) => f.debug_tuple("Int64").field(v).finish(),
            Self::Float64(v) => f.debug_tuple("Float64").field(v).finish(),
            Self::StringSlice(v) => f.debug_tuple("StringSlice").field(v).finish(),
            Self::BoolSlice(v) => f.debug_tuple("BoolSlice").field(v).finish(),
            Self::IntSlice(v) => f.debug_tuple("IntSlice").field(v).finish(),
            Self::Int64Slice(v) => f.debug_tuple("Int64Slice").field(v).finish(),
            Self::Float64Slice(v) => f.debug_tuple("Float64Slice").field(v).finish(),
            Self::Stringer(v) => write!(f, "Stringer({v})"),
            Self::Opaque(_) => f.write_str("Opaque(..)"),
            Self::Absent => f.write_str("Absent"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float64(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        Self::StringSlice(value)
    }
}

impl From<Vec<bool>> for AttributeValue {
    fn from(value: Vec<bool>) -> Self {
        Self::BoolSlice(value)
    }
}

impl From<Vec<i32>> for AttributeValue {
    fn from(value: Vec<i32>) -> Self {
        Self::IntSlice(value)
    }
}

impl From<Vec<i64>> for AttributeValue {
    fn from(value: Vec<i64>) -> Self {
        Self::Int64Slice(value)
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(value: Vec<f64>) -> Self {
        Self::Float64Slice(value)
    }
}

/// Optional forms of every supported scalar and slice.
impl<T> From<Option<T>> for AttributeValue
where
    T: Into<AttributeValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Self::Absent,
        }
    }
}

/// A timed record of one logical client operation.
///
/// Spans are two-state objects: active from creation until [`end`] is
/// called, ended afterwards. The client is responsible for calling
/// [`end`] exactly once; further calls are undefined behavior of the
/// wrapped SDK and are not policed here.
///
/// [`end`]: RequestSpan::end
pub trait RequestSpan: Send + Sync {
    /// Completes the span's duration measurement.
    fn end(&self);

    /// Returns the handle to thread into child span creation.
    fn context(&self) -> RequestSpanContext;

    /// Attaches an attribute to the span.
    ///
    /// Best effort: values the implementation cannot map are dropped with
    /// a diagnostic, never an error.
    fn set_attribute(&self, key: &str, value: AttributeValue);

    /// Attaches a named event at the given timestamp.
    ///
    /// The timestamp is supplied by the caller because the event may
    /// describe something that happened before this call was made.
    fn add_event(&self, name: &str, timestamp: SystemTime);
}

/// Factory for [`RequestSpan`]s, one per logical client operation.
pub trait RequestTracer: Send + Sync {
    /// Starts a span named `operation_name`.
    ///
    /// The span becomes a child of `parent` when that handle carries a
    /// context the implementation recognizes; otherwise it is a root
    /// span. This never fails.
    fn request_span(
        &self,
        parent: Option<&RequestSpanContext>,
        operation_name: &str,
    ) -> Box<dyn RequestSpan>;
}

/// A monotonically increasing numeric instrument.
pub trait Counter: Send + Sync {
    /// Adds `amount` to the counter.
    fn increment_by(&self, amount: u64);
}

/// An instrument recording a distribution of observed values.
pub trait ValueRecorder: Send + Sync {
    /// Records one observation of `value`.
    fn record_value(&self, value: u64);
}

/// Factory for the client's metric instruments.
///
/// Implementations are expected to hand back the same instrument for
/// repeated requests with the same name and tag mapping, so the client
/// calls these factories freely on its operation paths.
pub trait Meter: Send + Sync {
    /// Returns a counter for `name` with the given tag mapping.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying SDK refuses to create an
    /// instrument under `name`. The caller decides whether to proceed
    /// without metrics; nothing is retried here.
    fn counter(&self, name: &str, tags: &HashMap<String, String>)
        -> InstrumentResult<Arc<dyn Counter>>;

    /// Returns a value recorder for `name` with the given tag mapping.
    ///
    /// # Errors
    ///
    /// Same contract as [`Meter::counter`].
    fn value_recorder(
        &self,
        name: &str,
        tags: &HashMap<String, String>,
    ) -> InstrumentResult<Arc<dyn ValueRecorder>>;
}
