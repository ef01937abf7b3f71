//! Verdict engine
//!
//! A [`TestCase`] script walks one conversation through a [`Checker`], comparing frames
//! against [`Template`]s. Every mismatch escalates the run's [`Verdict`]; verdicts only ever
//! grow in severity (`none < inconclusive < pass < fail < error`).
//!
//! Runs are either *forced* (the test case is the only candidate for the conversation)
//! or not. A non-forced run that escalates to `inconclusive` before anything else
//! happened stops at once as not applicable, so the next candidate can be tried.
//!
//! ```rust
//! use coapscope::AnalysisConfig;
//! use coapscope::check::{CheckResult, Checker, MessageTemplate, Sender, TestCase, Verdict, run_check};
//! use coapscope::codec::{Code, CoapMessage, MessageType};
//! use coapscope::flow::{ConversationId, track};
//! use coapscope::types::Frame;
//!
//! struct GetContent;
//!
//! impl TestCase for GetContent {
//!     fn id(&self) -> &str { "TD_COAP_CORE_01" }
//!     fn objective(&self) -> &str { "Perform GET transaction (CON mode)" }
//!
//!     fn run(&self, checker: &mut Checker<'_>) -> CheckResult {
//!         let get = MessageTemplate::new().mtype(MessageType::Confirmable).code(Code::GET);
//!         checker.match_frame(Sender::Client, &get, Some(Verdict::Inconclusive))?;
//!         checker.advance()?;
//!         let content = MessageTemplate::new().mtype(MessageType::Acknowledgement).code(Code::CONTENT);
//!         checker.match_frame(Sender::Server, &content, Some(Verdict::Fail))?;
//!         Ok(())
//!     }
//! }
//!
//! let client = "10.0.0.1:40000".parse().unwrap();
//! let server = "10.0.0.2:5683".parse().unwrap();
//! let capture = track(
//!     [
//!         Frame::new(1, 0.0, client, server, CoapMessage::new(MessageType::Confirmable, Code::GET, 1).with_token([1])),
//!         Frame::new(2, 0.1, server, client, CoapMessage::new(MessageType::Acknowledgement, Code::CONTENT, 1).with_token([1])),
//!     ],
//!     &AnalysisConfig::default(),
//! );
//!
//! let report = run_check(&capture.conversations, ConversationId(0), &GetContent, true)?;
//! assert_eq!(report.verdict, Verdict::Pass);
//! # Ok::<(), coapscope::AnalysisError>(())
//! ```

mod checker;
mod runner;
mod template;
mod testcase;
mod verdict;

pub use checker::{Abort, CheckResult, Checker, Sender};
pub use runner::{CheckReport, run_check};
pub use template::{CodePattern, MatchOutcome, Mismatch, MessageTemplate, OptionPattern, Template};
pub use testcase::{Protocol, TestCase, TestCaseRegistry};
pub use verdict::{Transition, Verdict, VerdictState};
