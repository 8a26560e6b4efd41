//! Error types for the OpenTelemetry meter adapter

use std::fmt;

/// Errors surfaced by the metric instrument factories.
///
/// Only instrument creation can fail; the recording paths are best effort
/// and report problems through diagnostics instead.
#[derive(Debug)]
pub enum InstrumentError {
    /// The instrument name violates the SDK's naming rules, so the SDK
    /// would refuse it (the Rust SDK substitutes a silent no-op
    /// instrument; the rejection is surfaced here instead).
    InvalidInstrumentName {
        /// The offending name as requested by the caller
        name: String,
        /// Which naming rule the name violates
        reason: &'static str,
    },
}

impl fmt::Display for InstrumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentError::InvalidInstrumentName { name, reason } => {
                write!(f, "invalid instrument name {name:?}: {reason}")
            }
        }
    }
}

impl std::error::Error for InstrumentError {}

impl InstrumentError {
    /// Create a new invalid-instrument-name error
    #[must_use]
    pub fn invalid_instrument_name(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidInstrumentName {
            name: name.into(),
            reason,
        }
    }
}

/// Result type alias for instrument creation
pub type InstrumentResult<T> = Result<T, InstrumentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_instrument() {
        let err = InstrumentError::invalid_instrument_name(
            "9ops",
            "name must start with an ASCII letter",
        );
        assert_eq!(
            err.to_string(),
            "invalid instrument name \"9ops\": name must start with an ASCII letter"
        );
    }
}
