//! Exported-span assertions for the tracer adapter, driven through an
//! in-memory exporter the way the wrapped SDK's own tests do it.

use std::time::{Duration, UNIX_EPOCH};

use couchbase_opentelemetry::{
    AttributeValue, OpenTelemetryRequestSpan, OpenTelemetryRequestTracer, RequestSpan as _,
    RequestSpanContext, RequestTracer as _,
};
use opentelemetry::trace::{SpanId, Tracer as _, TracerProvider as _};
use opentelemetry::{Context, Value};
use opentelemetry_sdk::trace::{
    InMemorySpanExporter, InMemorySpanExporterBuilder, Sampler, SdkTracerProvider, SpanData,
};
use opentelemetry_sdk::Resource;
use tracing_test::traced_test;

struct TestHarness {
    provider: SdkTracerProvider,
    exporter: InMemorySpanExporter,
}

impl TestHarness {
    fn new() -> Self {
        let exporter = InMemorySpanExporterBuilder::new().build();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .with_sampler(Sampler::AlwaysOn)
            .with_resource(Resource::builder_empty().build())
            .build();

        Self { provider, exporter }
    }

    fn finished_spans(&self) -> Vec<SpanData> {
        let _ = self.provider.force_flush();
        self.exporter.get_finished_spans().unwrap()
    }
}

fn find_span<'a>(spans: &'a [SpanData], name: &str) -> &'a SpanData {
    spans
        .iter()
        .find(|span| span.name == name)
        .unwrap_or_else(|| panic!("no span named {name}"))
}

fn assert_attribute(span: &SpanData, key: &str, expected: &Value) {
    let value = span
        .attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| &kv.value);
    assert_eq!(value, Some(expected), "attribute {key}");
}

#[test]
fn request_span_exports_name_attributes_and_times() {
    let harness = TestHarness::new();
    let tracer = OpenTelemetryRequestTracer::new(&harness.provider);

    let span = tracer.request_span(None, "upsert");
    span.set_attribute("count", AttributeValue::from(5));
    span.set_attribute("flag", AttributeValue::from(true));
    span.end();

    let spans = harness.finished_spans();
    assert_eq!(spans.len(), 1);

    let span = &spans[0];
    assert_eq!(span.name, "upsert");
    assert_attribute(span, "count", &Value::I64(5));
    assert_attribute(span, "flag", &Value::Bool(true));
    assert!(span.start_time > UNIX_EPOCH);
    assert!(span.end_time >= span.start_time);
}

#[test]
fn child_span_links_to_its_parent() {
    let harness = TestHarness::new();
    let tracer = OpenTelemetryRequestTracer::new(&harness.provider);

    let parent = tracer.request_span(None, "parent");
    let child = tracer.request_span(Some(&parent.context()), "child");
    child.end();
    parent.end();

    let spans = harness.finished_spans();
    assert_eq!(spans.len(), 2);

    let parent = find_span(&spans, "parent");
    let child = find_span(&spans, "child");
    assert_eq!(child.parent_span_id, parent.span_context.span_id());
    assert_eq!(
        child.span_context.trace_id(),
        parent.span_context.trace_id()
    );
}

#[test]
fn externally_started_span_can_parent_client_spans() {
    let harness = TestHarness::new();
    let tracer = OpenTelemetryRequestTracer::new(&harness.provider);

    // An application starts its own span and wraps it for the client,
    // the way a caller passes a parent span into an operation's options.
    let sdk_tracer = harness.provider.tracer("test-demo");
    let parent = OpenTelemetryRequestSpan::new(Context::new(), sdk_tracer.start("myparentoperation"));

    let child = tracer.request_span(Some(&parent.context()), "upsert");
    child.end();
    parent.end();

    let spans = harness.finished_spans();
    let parent = find_span(&spans, "myparentoperation");
    let child = find_span(&spans, "upsert");
    assert_eq!(child.parent_span_id, parent.span_context.span_id());
}

#[test]
fn absent_or_foreign_parent_context_falls_back_to_a_root_span() {
    let harness = TestHarness::new();
    let tracer = OpenTelemetryRequestTracer::new(&harness.provider);

    let foreign = RequestSpanContext::new("some other tracer's handle");
    tracer.request_span(Some(&foreign), "orphan").end();
    tracer.request_span(Some(&RequestSpanContext::empty()), "bare").end();

    let spans = harness.finished_spans();
    assert_eq!(spans.len(), 2);
    for span in &spans {
        assert_eq!(span.parent_span_id, SpanId::INVALID);
    }
}

#[traced_test]
#[test]
fn unsupported_attribute_payload_is_dropped_not_fatal() {
    struct Weird;

    let harness = TestHarness::new();
    let tracer = OpenTelemetryRequestTracer::new(&harness.provider);

    let span = tracer.request_span(None, "upsert");
    span.set_attribute("weird", AttributeValue::opaque(Weird));
    span.set_attribute("kept", AttributeValue::from("value"));
    span.end();

    let spans = harness.finished_spans();
    assert_eq!(spans.len(), 1);
    assert!(spans[0]
        .attributes
        .iter()
        .all(|kv| kv.key.as_str() != "weird"));
    assert_attribute(&spans[0], "kept", &Value::String("value".into()));
    assert!(logs_contain("dropping the attribute"));
}

#[test]
fn events_carry_the_caller_supplied_timestamp() {
    let harness = TestHarness::new();
    let tracer = OpenTelemetryRequestTracer::new(&harness.provider);

    let happened_at = UNIX_EPOCH + Duration::from_secs(1_600_000_000);
    let span = tracer.request_span(None, "upsert");
    span.add_event("request_encoding", happened_at);
    span.end();

    let spans = harness.finished_spans();
    let events = &spans[0].events.events;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "request_encoding");
    assert_eq!(events[0].timestamp, happened_at);
}

#[test]
fn span_context_survives_a_passthrough_round_trip() {
    let harness = TestHarness::new();
    let tracer = OpenTelemetryRequestTracer::new(&harness.provider);

    let span = tracer.request_span(None, "parent");
    // The client treats the handle as opaque; cloning and re-passing it
    // must keep working.
    let handle = span.context();
    let copy = handle.clone();
    drop(handle);
    let child = tracer.request_span(Some(&copy), "child");
    child.end();
    span.end();

    let spans = harness.finished_spans();
    let parent = find_span(&spans, "parent");
    let child = find_span(&spans, "child");
    assert_eq!(child.parent_span_id, parent.span_context.span_id());
}
