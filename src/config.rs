//! Analysis configuration
//!
//! Loaded from YAML; every field has a default so an empty document is valid:
//!
//! ```rust
//! use coapscope::AnalysisConfig;
//!
//! let config = AnalysisConfig::from_yaml_str(
//!     "transmission:\n  ack_timeout: 2.0\n  max_retransmit: 4\ntest_cases: [TD_COAP_CORE_01]\n",
//! )?;
//! assert_eq!(config.max_timeout(), 98.0);
//! assert!(config.selects("TD_COAP_CORE_01"));
//! assert!(!config.selects("TD_COAP_CORE_02"));
//! # Ok::<(), coapscope::AnalysisError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::{AnalysisError, Result};

/// Retransmission parameters used to bound message-id reuse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransmissionParameters {
    /// Initial acknowledgement timeout in seconds
    pub ack_timeout: f64,
    /// Random factor applied to the initial timeout
    pub ack_random_factor: f64,
    /// Maximum number of retransmissions
    pub max_retransmit: u32,
}

impl Default for TransmissionParameters {
    fn default() -> Self {
        Self { ack_timeout: 2.0, ack_random_factor: 1.5, max_retransmit: 4 }
    }
}

impl TransmissionParameters {
    /// Lifetime of a message-id after its first transmission, in seconds.
    ///
    /// `ack_timeout + round(ack_timeout * ack_random_factor * 2^max_retransmit) * 2`
    pub fn max_timeout(&self) -> f64 {
        let backoff = self.ack_timeout * self.ack_random_factor * 2f64.powi(self.max_retransmit as i32);
        self.ack_timeout + backoff.round() * 2.0
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.ack_timeout > 0.0) {
            return Err(AnalysisError::config(
                "transmission",
                format!("ack_timeout must be positive, got {}", self.ack_timeout),
            ));
        }
        if !(self.ack_random_factor >= 1.0) {
            return Err(AnalysisError::config(
                "transmission",
                format!("ack_random_factor must be at least 1, got {}", self.ack_random_factor),
            ));
        }
        if self.max_retransmit > 20 {
            return Err(AnalysisError::config(
                "transmission",
                format!("max_retransmit {} is unreasonably large", self.max_retransmit),
            ));
        }
        Ok(())
    }
}

/// Configuration for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub transmission: TransmissionParameters,
    /// Link each conversation to the next one between the same hosts
    pub link_conversations: bool,
    /// Test case ids to run; empty runs every registered test case
    pub test_cases: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            transmission: TransmissionParameters::default(),
            link_conversations: true,
            test_cases: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    /// Parse and validate a YAML configuration document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: AnalysisConfig = if yaml.trim().is_empty() {
            AnalysisConfig::default()
        } else {
            serde_yaml_ng::from_str(yaml).map_err(|e| AnalysisError::Config {
                context: "AnalysisConfig deserialization".to_string(),
                details: e.to_string(),
            })?
        };
        config.validate()?;
        debug!(
            max_timeout = config.max_timeout(),
            selected = config.test_cases.len(),
            "Loaded analysis configuration"
        );
        Ok(config)
    }

    /// Read a YAML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = std::fs::read_to_string(&path)
            .map_err(|e| AnalysisError::file_error(path.as_ref().to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        self.transmission.validate()?;
        if let Some(empty) = self.test_cases.iter().position(|id| id.trim().is_empty()) {
            return Err(AnalysisError::config(
                "test_cases",
                format!("entry {} is an empty test case id", empty),
            ));
        }
        Ok(())
    }

    pub fn max_timeout(&self) -> f64 {
        self.transmission.max_timeout()
    }

    /// Whether the test case with this id takes part in the analysis.
    pub fn selects(&self, test_case: &str) -> bool {
        self.test_cases.is_empty() || self.test_cases.iter().any(|id| id == test_case)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn default_max_timeout() {
        assert_eq!(TransmissionParameters::default().max_timeout(), 98.0);
    }

    #[test]
    fn empty_document_uses_defaults() -> Result<()> {
        let config = AnalysisConfig::from_yaml_str("")?;
        assert_eq!(config, AnalysisConfig::default());
        assert!(config.link_conversations);
        assert!(config.selects("anything"));
        Ok(())
    }

    #[test]
    fn partial_document_keeps_other_defaults() -> Result<()> {
        let config = AnalysisConfig::from_yaml_str("transmission:\n  max_retransmit: 0\n")?;
        assert_eq!(config.transmission.ack_timeout, 2.0);
        // 2 + round(2 * 1.5 * 1) * 2
        assert_eq!(config.max_timeout(), 8.0);
        Ok(())
    }

    #[test]
    fn invalid_values_are_rejected() {
        for yaml in [
            "transmission:\n  ack_timeout: 0\n",
            "transmission:\n  ack_random_factor: 0.5\n",
            "transmission:\n  max_retransmit: 99\n",
            "test_cases: ['']\n",
            "link_conversations: [not, a, bool]\n",
        ] {
            let error = AnalysisConfig::from_yaml_str(yaml).unwrap_err();
            assert!(matches!(error, AnalysisError::Config { .. }), "{}: {:?}", yaml, error);
        }
    }

    #[test]
    fn missing_file_reports_path() {
        let error = AnalysisConfig::from_file("/nonexistent/coapscope.yaml").unwrap_err();
        match error {
            AnalysisError::File { path, .. } => assert!(path.ends_with("coapscope.yaml")),
            other => panic!("Expected File error, got {:?}", other),
        }
    }
}
