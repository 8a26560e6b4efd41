//! OpenTelemetry-backed implementation of the client's tracer interface
//!
//! Wraps OpenTelemetry span creation behind the [`RequestTracer`] and
//! [`RequestSpan`] capability traits and translates the client's
//! loosely-typed attribute values into OpenTelemetry's typed attribute
//! representation. Instrumentation here is best effort: a value that
//! cannot be mapped is dropped with a diagnostic, never an error, because
//! failing a client operation over a telemetry formatting issue is worse
//! than losing one attribute.

use std::time::SystemTime;

use opentelemetry::global::BoxedTracer;
use opentelemetry::trace::{Span, TraceContextExt, Tracer, TracerProvider};
use opentelemetry::{Array, Context, KeyValue, StringValue, Value};
use tracing::{debug, warn};

use crate::api::{AttributeValue, RequestSpan, RequestSpanContext, RequestTracer};

/// An implementation of the client's `RequestTracer` interface which wraps
/// an OpenTelemetry tracer.
pub struct OpenTelemetryRequestTracer {
    wrapped: BoxedTracer,
}

impl OpenTelemetryRequestTracer {
    /// Creates a new `OpenTelemetryRequestTracer` from a tracer provider.
    pub fn new<P>(provider: &P) -> Self
    where
        P: TracerProvider,
        P::Tracer: Send + Sync + 'static,
        <P::Tracer as Tracer>::Span: Send + Sync + 'static,
    {
        Self {
            wrapped: BoxedTracer::new(Box::new(provider.tracer(crate::INSTRUMENTATION_SCOPE))),
        }
    }

    /// Creates a new `OpenTelemetryRequestTracer` around an existing
    /// tracer handle.
    #[must_use]
    pub fn from_tracer(tracer: BoxedTracer) -> Self {
        Self { wrapped: tracer }
    }
}

impl RequestTracer for OpenTelemetryRequestTracer {
    fn request_span(
        &self,
        parent: Option<&RequestSpanContext>,
        operation_name: &str,
    ) -> Box<dyn RequestSpan> {
        let parent_cx = match parent.and_then(|parent| parent.downcast_ref::<Context>()) {
            Some(cx) => cx.clone(),
            None => {
                if parent.is_some_and(|parent| !parent.is_empty()) {
                    debug!(
                        operation_name,
                        "parent handle does not carry an OpenTelemetry context, starting a root span"
                    );
                }
                Context::new()
            }
        };
        let span = self
            .wrapped
            .start_with_context(operation_name.to_owned(), &parent_cx);
        Box::new(OpenTelemetryRequestSpan::new(parent_cx, span))
    }
}

/// An implementation of the client's `RequestSpan` interface which wraps
/// an OpenTelemetry span.
///
/// The wrapper owns the context the span was started under, with the span
/// attached to it, for the span's whole lifetime. [`RequestSpan::end`]
/// must be called exactly once by the owner; the client's call discipline
/// guarantees that and the wrapper does not police it.
pub struct OpenTelemetryRequestSpan {
    cx: Context,
}

impl OpenTelemetryRequestSpan {
    /// Wraps an already-started span and the context it was started under.
    ///
    /// Useful for handing the client a parent span that was created by the
    /// application's own instrumentation.
    pub fn new<S>(cx: Context, span: S) -> Self
    where
        S: Span + Send + Sync + 'static,
    {
        Self {
            cx: cx.with_span(span),
        }
    }
}

impl RequestSpan for OpenTelemetryRequestSpan {
    fn end(&self) {
        self.cx.span().end();
    }

    fn context(&self) -> RequestSpanContext {
        RequestSpanContext::new(self.cx.clone())
    }

    fn set_attribute(&self, key: &str, value: AttributeValue) {
        if let Some(value) = otel_value(key, value) {
            self.cx
                .span()
                .set_attribute(KeyValue::new(key.to_owned(), value));
        }
    }

    fn add_event(&self, name: &str, timestamp: SystemTime) {
        self.cx
            .span()
            .add_event_with_timestamp(name.to_owned(), timestamp, Vec::new());
    }
}

/// Maps a loosely-typed attribute value to its OpenTelemetry form.
///
/// Returns `None` for payloads that have no mapping; those are dropped.
fn otel_value(key: &str, value: AttributeValue) -> Option<Value> {
    match value {
        AttributeValue::String(v) => Some(Value::String(v.into())),
        AttributeValue::Bool(v) => Some(Value::Bool(v)),
        AttributeValue::Int(v) => Some(Value::I64(i64::from(v))),
        AttributeValue::Int64(v) => Some(Value::I64(v)),
        AttributeValue::Float64(v) => Some(Value::F64(v)),
        AttributeValue::StringSlice(v) => Some(Value::Array(Array::String(
            v.into_iter().map(StringValue::from).collect(),
        ))),
        AttributeValue::BoolSlice(v) => Some(Value::Array(Array::Bool(v))),
        AttributeValue::IntSlice(v) => Some(Value::Array(Array::I64(
            v.into_iter().map(i64::from).collect(),
        ))),
        AttributeValue::Int64Slice(v) => Some(Value::Array(Array::I64(v))),
        AttributeValue::Float64Slice(v) => Some(Value::Array(Array::F64(v))),
        AttributeValue::Stringer(v) => Some(Value::String(v.to_string().into())),
        AttributeValue::Opaque(_) => {
            warn!(
                key,
                "span attribute value has an unsupported type, dropping the attribute"
            );
            None
        }
        AttributeValue::Absent => {
            debug!(key, "span attribute value is absent, dropping the attribute");
            None
        }
    }
}
