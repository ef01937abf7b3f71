//! Error types for capture analysis.
//!
//! All errors implement the `std::error::Error` trait and carry structured context
//! (byte offsets, file paths, test case ids) for diagnostics.
//!
//! ## Error Categories
//!
//! - **Decode Errors**: malformed option chains or message headers in a captured frame
//! - **Encode Errors**: option lists that cannot be serialised (bad explicit deltas)
//! - **Configuration Errors**: invalid analysis configuration or unreadable config files
//! - **Script Errors**: faults raised by a conformance check script
//!
//! ## Frame-local errors
//!
//! A decode error only ever disqualifies the frame it came from; the rest of the
//! capture is still analysed:
//!
//! ```rust
//! use coapscope::AnalysisError;
//!
//! let error = AnalysisError::decode("Option header", 12, "length overruns input");
//! assert!(error.is_frame_local());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for analysis operations.
pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;

/// Main error type for analysis operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AnalysisError {
    #[error("Decode error in {context} at offset {offset}: {details}")]
    Decode { context: String, offset: usize, details: String },

    #[error("Encode error: {details}")]
    Encode { details: String },

    #[error("Configuration error in {context}: {details}")]
    Config { context: String, details: String },

    #[error("Configuration file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Test case '{test_case}' failed: {details}")]
    Script { test_case: String, details: String },
}

impl AnalysisError {
    /// Returns whether this error only affects a single captured frame.
    ///
    /// Frame-local errors are recorded on the frame and never abort a run.
    pub fn is_frame_local(&self) -> bool {
        match self {
            AnalysisError::Decode { .. } => true,
            AnalysisError::Encode { .. } => false,
            AnalysisError::Config { .. } => false,
            AnalysisError::File { .. } => false,
            AnalysisError::Script { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            AnalysisError::Decode { .. } => vec![
                "Check that the capture only contains CoAP datagrams on the analysed ports",
                "Verify the capture was not truncated (snaplen too small)",
                "Inspect the frame bytes around the reported offset",
            ],
            AnalysisError::Encode { .. } => vec![
                "Remove explicit option deltas to let the encoder insert fenceposts",
                "Keep explicit deltas within the 4-bit range",
            ],
            AnalysisError::Config { .. } => vec![
                "Check the YAML syntax of the configuration",
                "Compare the transmission parameters with the protocol defaults",
            ],
            AnalysisError::File { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
            ],
            AnalysisError::Script { .. } => vec![
                "Inspect the check log for the failing step",
                "Verify the test case applies to the analysed capture",
            ],
        }
    }

    /// Helper constructor for decode errors.
    pub fn decode(context: impl Into<String>, offset: usize, details: impl Into<String>) -> Self {
        AnalysisError::Decode { context: context.into(), offset, details: details.into() }
    }

    /// Helper constructor for encode errors.
    pub fn encode(details: impl Into<String>) -> Self {
        AnalysisError::Encode { details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(context: impl Into<String>, details: impl Into<String>) -> Self {
        AnalysisError::Config { context: context.into(), details: details.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        AnalysisError::File { path, source }
    }

    /// Helper constructor for script faults.
    pub fn script(test_case: impl Into<String>, details: impl Into<String>) -> Self {
        AnalysisError::Script { test_case: test_case.into(), details: details.into() }
    }

    /// Byte offset of a decode error, if any.
    pub fn offset(&self) -> Option<usize> {
        match self {
            AnalysisError::Decode { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}
