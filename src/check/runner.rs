//! Running one test case against one conversation

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, warn};

use super::checker::{Abort, Checker};
use super::testcase::TestCase;
use super::verdict::Verdict;
use crate::flow::{Conversation, ConversationId};
use crate::types::FrameId;
use crate::{AnalysisError, Result};

/// Outcome of one check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub test_case: String,
    pub conversation: ConversationId,
    pub verdict: Verdict,
    /// `false` when a non-forced run found the test case does not apply
    pub applicable: bool,
    /// Frames blamed by mismatches, ascending
    pub implicated: Vec<FrameId>,
    pub log: String,
}

/// Run `test_case` on conversation `id`.
///
/// Halts are absorbed and keep the verdict reached so far. Faults, script errors and
/// panics force `Error`. An unknown conversation id is the only error returned.
pub fn run_check(
    conversations: &[Conversation],
    id: ConversationId,
    test_case: &dyn TestCase,
    forced: bool,
) -> Result<CheckReport> {
    let mut checker = Checker::new(conversations, id, forced, test_case.reverse_proxy())
        .ok_or_else(|| {
            AnalysisError::script(test_case.id(), format!("no {} in capture", id))
        })?;

    let outcome = catch_unwind(AssertUnwindSafe(|| test_case.run(&mut checker)));
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(Abort::Halt)) => {
            debug!(test_case = test_case.id(), conversation = id.0, "Check halted");
        }
        Ok(Err(Abort::Fault(description))) => {
            warn!(test_case = test_case.id(), conversation = id.0, "Check faulted: {}", description);
            checker.fault(&description);
        }
        Err(panic) => {
            let description = panic_message(panic.as_ref());
            warn!(test_case = test_case.id(), conversation = id.0, "Check panicked: {}", description);
            checker.fault(&description);
        }
    }

    let report = CheckReport {
        test_case: test_case.id().to_string(),
        conversation: id,
        verdict: checker.verdict(),
        applicable: checker.state().is_applicable(),
        implicated: checker.implicated().collect(),
        log: checker.log_text().to_string(),
    };
    debug!(
        test_case = %report.test_case,
        conversation = id.0,
        verdict = %report.verdict,
        applicable = report.applicable,
        "Check finished"
    );
    Ok(report)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "check panicked".to_string()
    }
}
