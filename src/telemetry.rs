//! Telemetry configuration handed to the client at connection setup
//!
//! Bundles the optional tracer and meter adapters so an application can
//! pass both to the client in one value. All providers are explicitly
//! passed - no global providers are used.

use std::fmt;
use std::sync::Arc;

use crate::api::{Meter, RequestTracer};

/// Telemetry configuration for a client connection
///
/// Both halves are optional and independent; the client simply skips the
/// instrumentation for whichever half is absent.
#[derive(Clone, Default)]
pub struct Telemetry {
    tracer: Option<Arc<dyn RequestTracer>>,
    meter: Option<Arc<dyn Meter>>,
}

impl Telemetry {
    /// Create a telemetry configuration with no instrumentation
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for configuring telemetry
    #[must_use]
    pub fn builder() -> TelemetryBuilder {
        TelemetryBuilder::new()
    }

    /// The tracer the client should create request spans with, if any
    #[must_use]
    pub fn tracer(&self) -> Option<&Arc<dyn RequestTracer>> {
        self.tracer.as_ref()
    }

    /// The meter the client should create instruments with, if any
    #[must_use]
    pub fn meter(&self) -> Option<&Arc<dyn Meter>> {
        self.meter.as_ref()
    }
}

impl fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telemetry")
            .field("tracer", &self.tracer.is_some())
            .field("meter", &self.meter.is_some())
            .finish()
    }
}

/// Builder for [`Telemetry`]
///
/// # Example
///
/// ```rust,ignore
/// let telemetry = Telemetry::builder()
///     .with_tracer(Arc::new(OpenTelemetryRequestTracer::new(&tracer_provider)))
///     .with_meter(Arc::new(OpenTelemetryMeter::new(&meter_provider)))
///     .build();
/// ```
pub struct TelemetryBuilder {
    tracer: Option<Arc<dyn RequestTracer>>,
    meter: Option<Arc<dyn Meter>>,
}

impl TelemetryBuilder {
    /// Create a new builder with no telemetry enabled
    #[must_use]
    pub fn new() -> Self {
        Self {
            tracer: None,
            meter: None,
        }
    }

    /// Add a tracer for request span creation
    #[must_use]
    pub fn with_tracer(mut self, tracer: Arc<dyn RequestTracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Add a meter for metric instrument creation
    #[must_use]
    pub fn with_meter(mut self, meter: Arc<dyn Meter>) -> Self {
        self.meter = Some(meter);
        self
    }

    /// Build the configured telemetry bundle
    #[must_use]
    pub fn build(self) -> Telemetry {
        Telemetry {
            tracer: self.tracer,
            meter: self.meter,
        }
    }
}

impl Default for TelemetryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
