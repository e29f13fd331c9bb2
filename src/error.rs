//! Error types
//!
//! None of these are fatal to a round: callers log them and fall back.

/// Failures on the gesture socket wire format
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed gesture frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),
    #[error("failed to encode control message: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A configuration value that didn't match any known option
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("unknown {field}: {value:?}")]
    UnknownValue { field: &'static str, value: String },
    #[error("invalid {field}: {value:?} is not a number")]
    NotANumber { field: &'static str, value: String },
}

impl SettingsError {
    pub(crate) fn unknown(field: &'static str, value: &str) -> Self {
        Self::UnknownValue {
            field,
            value: value.to_string(),
        }
    }
}
