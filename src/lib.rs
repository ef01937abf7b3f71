//! Passive conformance analysis for captured CoAP traffic.
//!
//! coapscope reconstructs the logical exchanges in a packet capture and runs scripted
//! conformance checks over them, without ever touching the network.
//!
//! # Features
//!
//! - **Option codec**: delta-compressed option chains with fencepost options and the
//!   end-of-options marker
//! - **Flow tracking**: request/response, observation and block-wise exchanges
//!   reassembled per endpoint pair from a noisy frame stream
//! - **Verdict engine**: severity-ranked verdicts with halt and not-applicable handling
//! - **Aggregation**: one verdict per client host, server host and test case
//!
//! # Quick Start
//!
//! ```rust
//! use coapscope::{Analysis, AnalysisConfig, Verdict};
//! use coapscope::check::{CheckResult, Checker, MessageTemplate, Sender, TestCase, TestCaseRegistry};
//! use coapscope::codec::{Code, CoapMessage, MessageType};
//! use coapscope::types::Frame;
//!
//! struct Ping;
//!
//! impl TestCase for Ping {
//!     fn id(&self) -> &str { "TD_COAP_PING" }
//!     fn objective(&self) -> &str { "Empty confirmable message is answered with a reset" }
//!
//!     fn run(&self, checker: &mut Checker<'_>) -> CheckResult {
//!         let ping = MessageTemplate::new().mtype(MessageType::Confirmable).code(Code::EMPTY);
//!         checker.match_frame(Sender::Client, &ping, Some(Verdict::Inconclusive))?;
//!         checker.advance()?;
//!         let reset = MessageTemplate::new().mtype(MessageType::Reset);
//!         checker.match_frame(Sender::Server, &reset, Some(Verdict::Fail))?;
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = TestCaseRegistry::new();
//! registry.register(Ping)?;
//!
//! let client = "10.0.0.1:40000".parse().unwrap();
//! let server = "10.0.0.2:5683".parse().unwrap();
//! let frames = vec![
//!     Frame::from_datagram(1, 0.0, client, server, &[0x40, 0x00, 0x12, 0x34]),
//!     Frame::from_datagram(2, 0.1, server, client, &[0x70, 0x00, 0x12, 0x34]),
//! ];
//!
//! let report = Analysis::new(&registry, AnalysisConfig::default()).analyse(frames)?;
//! assert_eq!(report.verdict(), Verdict::Pass);
//! # Ok::<(), coapscope::AnalysisError>(())
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Wire format
pub mod codec;

// Analysis pipeline
pub mod analysis;
pub mod check;
pub mod config;
pub mod flow;

// Core exports
pub use error::*;
pub use types::*;

pub use analysis::{Analysis, AnalysisReport, Bucket, TestCaseSummary};
pub use check::{CheckReport, Verdict, run_check};
pub use codec::{decode_options, encode_options};
pub use config::{AnalysisConfig, TransmissionParameters};
pub use flow::{Conversation, ConversationId, TrackedCapture, track};
