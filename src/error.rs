//! Error types for loading game balance data.
//!
//! The simulation itself never fails: absent bodies and handles are no-ops.
//! The only fallible surface is reading a [`crate::Tuning`] file.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TuningError {
    /// The tuning file could not be read
    #[error("failed to read tuning file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The tuning JSON is malformed
    #[error("failed to parse tuning JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is outside its usable range
    #[error("invalid tuning value '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl TuningError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
