/*!
`couchbase-opentelemetry` bridges the Couchbase client's telemetry callback
interfaces to OpenTelemetry's span and metric instrument APIs.

The client emits request spans and operation counters/histograms through a
small set of capability traits ([`RequestTracer`], [`Meter`], ...) without
depending on any telemetry SDK. This crate provides the OpenTelemetry
implementations of those traits: construct the adapters from your
configured OpenTelemetry providers and hand them to the client at
connection setup.

# Example

```rust,no_run
use couchbase_opentelemetry::{
    OpenTelemetryRequestTracer, RequestSpan as _, RequestTracer as _,
};
use opentelemetry::global;

let tracer = OpenTelemetryRequestTracer::new(&global::tracer_provider());

// The client drives the adapter like this for every operation it executes.
let span = tracer.request_span(None, "upsert");
span.set_attribute("db.operation", "upsert".into());
let dispatch = tracer.request_span(Some(&span.context()), "dispatch_to_server");
dispatch.end();
span.end();
```

Metrics work the same way (requires the `metrics` feature, on by default):

```rust,ignore
use couchbase_opentelemetry::{Meter as _, OpenTelemetryMeter};
use std::collections::HashMap;

let meter = OpenTelemetryMeter::new(&meter_provider);
let tags = HashMap::from([("db.operation".to_string(), "upsert".to_string())]);
let counter = meter.counter("db.couchbase.operations", &tags)?;
counter.increment_by(1);
```

# Behavior

- **Instrument caching** - one instrument per unique (name, tag mapping)
  pair, created lazily and shared for the adapter's lifetime, safe under
  concurrent first use from multiple operation threads.
- **Best-effort instrumentation** - attribute values the tracer cannot
  map and metric values outside the signed 64-bit range never fail the
  operation being instrumented; they are dropped or clamped with a
  `tracing` diagnostic.
- **Explicit providers** - nothing in this crate consults the global
  OpenTelemetry state on its own; every adapter is built from the
  provider you pass in.

# Limitations

Instrument creation is validated against OpenTelemetry's instrument name
rules up front, because the Rust SDK swallows invalid names into silent
no-op instruments instead of reporting them.
*/
#![warn(clippy::all, clippy::pedantic)]

pub mod api;
pub mod error;
#[cfg(feature = "metrics")]
pub mod meter;
pub mod telemetry;
pub mod tracer;

pub use api::{
    AttributeValue, Counter, Meter, RequestSpan, RequestSpanContext, RequestTracer, ValueRecorder,
};
pub use error::{InstrumentError, InstrumentResult};
#[cfg(feature = "metrics")]
pub use meter::OpenTelemetryMeter;
pub use telemetry::{Telemetry, TelemetryBuilder};
pub use tracer::{OpenTelemetryRequestSpan, OpenTelemetryRequestTracer};

/// Instrumentation scope both adapters register under.
pub(crate) const INSTRUMENTATION_SCOPE: &str = "com.couchbase.client/rust";
