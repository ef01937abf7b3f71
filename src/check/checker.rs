//! Script-facing cursor over one conversation

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::net::SocketAddr;
use tracing::{debug, trace};

use super::template::Template;
use super::verdict::{Transition, Verdict, VerdictState};
use crate::AnalysisError;
use crate::codec::CoapMessage;
use crate::flow::{Conversation, ConversationId};
use crate::types::{Frame, FrameId};

/// Early exit from a check script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Abort {
    /// Further checks are pointless; the verdict recorded so far stands
    Halt,
    /// The script itself is broken; the verdict becomes `Error`
    Fault(String),
}

impl From<AnalysisError> for Abort {
    fn from(error: AnalysisError) -> Self {
        Abort::Fault(error.to_string())
    }
}

/// Result type of check script steps.
pub type CheckResult<T = ()> = std::result::Result<T, Abort>;

/// Expected sender of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    Client,
    Server,
    Any,
}

/// Cursor handed to [`TestCase::run`](super::TestCase::run).
///
/// Starts on the first frame of the conversation; scripts walk forward with
/// [`advance`](Self::advance) and compare each frame with [`match_frame`](Self::match_frame).
pub struct Checker<'a> {
    conversations: &'a [Conversation],
    current: usize,
    position: usize,
    state: VerdictState,
    forced: bool,
    reverse_proxy: bool,
    implicated: BTreeSet<FrameId>,
    log: String,
}

impl<'a> Checker<'a> {
    /// Cursor on conversation `start` of `conversations`, or `None` if it does not exist.
    pub fn new(
        conversations: &'a [Conversation],
        start: ConversationId,
        forced: bool,
        reverse_proxy: bool,
    ) -> Option<Self> {
        conversations.get(start.0)?;
        Some(Self {
            conversations,
            current: start.0,
            position: 0,
            state: VerdictState::None,
            forced,
            reverse_proxy,
            implicated: BTreeSet::new(),
            log: String::new(),
        })
    }

    pub fn conversation(&self) -> &'a Conversation {
        &self.conversations[self.current]
    }

    /// Current frame, `None` once the conversation is exhausted.
    pub fn frame(&self) -> Option<&'a Frame> {
        self.conversation().frames.get(self.position)
    }

    pub fn message(&self) -> Option<&'a CoapMessage> {
        self.frame().and_then(|frame| frame.message.as_ref())
    }

    pub fn client(&self) -> SocketAddr {
        self.conversation().client
    }

    pub fn server(&self) -> SocketAddr {
        self.conversation().server
    }

    pub fn verdict(&self) -> Verdict {
        self.state.verdict()
    }

    pub fn state(&self) -> VerdictState {
        self.state
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }

    pub fn implicated(&self) -> impl Iterator<Item = FrameId> + '_ {
        self.implicated.iter().copied()
    }

    pub fn log_text(&self) -> &str {
        &self.log
    }

    /// Append a line to the run log.
    pub fn log(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        trace!(conversation = self.current, "{}", message);
        self.log.push_str(message);
        self.log.push('\n');
    }

    /// Escalate the verdict. Halts a non-forced run on its first inconclusive escalation.
    pub fn set_verdict(&mut self, verdict: Verdict, message: impl AsRef<str>) -> CheckResult {
        let message = message.as_ref();
        match self.state.apply(verdict, self.forced) {
            Transition::Stay => {
                self.log(format!("{}: {}", verdict, message));
                Ok(())
            }
            Transition::Escalate(verdict) => {
                debug!(conversation = self.current, %verdict, "Verdict escalated");
                self.log(format!("{}: {}", verdict, message));
                Ok(())
            }
            Transition::Halt => {
                debug!(conversation = self.current, "Test case does not apply");
                self.log(format!("not applicable: {}", message));
                Err(Abort::Halt)
            }
        }
    }

    /// Compare the current frame against `template`.
    ///
    /// A mismatch (wrong sender, undecoded frame, failed template or no current frame)
    /// implicates the frame and escalates to `verdict`; a match escalates to `Pass`.
    /// With `verdict == None` the call is a silent probe that changes nothing.
    pub fn match_frame(
        &mut self,
        sender: Sender,
        template: &dyn Template,
        verdict: Option<Verdict>,
    ) -> CheckResult<bool> {
        let Some(frame) = self.frame() else {
            if let Some(verdict) = verdict {
                self.set_verdict(verdict, "expected a frame, conversation is exhausted")?;
            }
            return Ok(false);
        };

        let mut problems = Vec::new();
        if !self.sent_by(frame, sender) {
            problems.push(format!("{} is not the expected {:?} endpoint", frame.source, sender));
        }
        match &frame.message {
            Some(message) => problems
                .extend(template.matches(message).mismatches().iter().map(ToString::to_string)),
            None => problems.push("frame has no decoded message".to_string()),
        }

        let Some(verdict) = verdict else {
            return Ok(problems.is_empty());
        };

        if problems.is_empty() {
            self.set_verdict(Verdict::Pass, format!("{} matches", frame.id))?;
            return Ok(true);
        }

        self.implicated.insert(frame.id);
        let mut message = format!("{} does not match", frame.id);
        for problem in &problems {
            let _ = write!(message, "\n    {}", problem);
        }
        self.set_verdict(verdict, message)?;
        Ok(false)
    }

    fn sent_by(&self, frame: &Frame, sender: Sender) -> bool {
        match sender {
            Sender::Any => true,
            Sender::Client => frame.source == self.client(),
            Sender::Server if self.reverse_proxy => frame.source.ip() == self.server().ip(),
            Sender::Server => frame.source == self.server(),
        }
    }

    /// Move to the next frame; a premature end is inconclusive and halts the run.
    pub fn advance(&mut self) -> CheckResult {
        if self.advance_optional() {
            return Ok(());
        }
        self.set_verdict(Verdict::Inconclusive, "premature end of conversation")?;
        Err(Abort::Halt)
    }

    /// Move to the next frame if there is one.
    pub fn advance_optional(&mut self) -> bool {
        let len = self.conversation().len();
        if self.position < len {
            self.position += 1;
        }
        self.position < len
    }

    /// Like [`advance`](Self::advance), then skip empty acknowledgements.
    pub fn advance_skip_empty_ack(&mut self) -> CheckResult {
        self.advance()?;
        while self.message().is_some_and(CoapMessage::is_empty_ack) {
            self.advance()?;
        }
        Ok(())
    }

    /// Log `reason` and build the abort signal: `return Err(checker.halt("..."))`.
    pub fn halt(&mut self, reason: impl AsRef<str>) -> Abort {
        self.log(format!("halt: {}", reason.as_ref()));
        Abort::Halt
    }

    /// Continue on the next conversation between the same hosts.
    pub fn chain(&mut self) -> CheckResult {
        match self.conversation().next {
            Some(next) if next.0 < self.conversations.len() => {
                self.log(format!("chaining into {}", next));
                self.current = next.0;
                self.position = 0;
                Ok(())
            }
            _ => {
                self.set_verdict(Verdict::Inconclusive, "no following conversation to chain into")?;
                Err(Abort::Halt)
            }
        }
    }

    /// Record a script fault; the verdict becomes `Error` whatever it was.
    pub(crate) fn fault(&mut self, description: &str) {
        self.log(format!("error: {}", description));
        self.state = VerdictState::Error;
    }
}
