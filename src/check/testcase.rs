//! Test case interface and registry

use serde::{Deserialize, Serialize};
use std::fmt;

use super::checker::{CheckResult, Checker};
use crate::config::AnalysisConfig;
use crate::{AnalysisError, Result};

/// Protocol a test case targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Protocol {
    #[default]
    Coap,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Coap => f.write_str("CoAP"),
        }
    }
}

/// A scripted conformance check run against one conversation at a time.
pub trait TestCase {
    /// Unique identifier, e.g. `TD_COAP_CORE_01`
    fn id(&self) -> &str;

    fn objective(&self) -> &str;

    fn protocol(&self) -> Protocol {
        Protocol::Coap
    }

    /// Responses may come from a proxy port other than the request's destination.
    fn reverse_proxy(&self) -> bool {
        false
    }

    fn run(&self, checker: &mut Checker<'_>) -> CheckResult;
}

/// Ordered collection of test cases.
#[derive(Default)]
pub struct TestCaseRegistry {
    test_cases: Vec<Box<dyn TestCase>>,
}

impl TestCaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a test case; ids must be unique.
    pub fn register<T>(&mut self, test_case: T) -> Result<()>
    where
        T: TestCase + 'static,
    {
        if self.get(test_case.id()).is_some() {
            return Err(AnalysisError::config(
                "test case registry",
                format!("duplicate test case id {}", test_case.id()),
            ));
        }
        self.test_cases.push(Box::new(test_case));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&dyn TestCase> {
        self.iter().find(|test_case| test_case.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn TestCase> {
        self.test_cases.iter().map(|test_case| test_case.as_ref())
    }

    pub fn len(&self) -> usize {
        self.test_cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.test_cases.is_empty()
    }

    /// Test cases for `protocol` selected by `config`, in registration order.
    pub fn select(&self, protocol: Protocol, config: &AnalysisConfig) -> Vec<&dyn TestCase> {
        self.iter()
            .filter(|test_case| test_case.protocol() == protocol && config.selects(test_case.id()))
            .collect()
    }
}

impl fmt::Debug for TestCaseRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter().map(|test_case| test_case.id())).finish()
    }
}
