//! Verdict severity and the per-run escalation state machine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a check, ordered by severity.
///
/// `None < Inconclusive < Pass < Fail < Error`
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    #[default]
    None,
    Inconclusive,
    Pass,
    Fail,
    Error,
}

impl Verdict {
    pub const ALL: [Verdict; 5] =
        [Verdict::None, Verdict::Inconclusive, Verdict::Pass, Verdict::Fail, Verdict::Error];

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::None => "none",
            Verdict::Inconclusive => "inconclusive",
            Verdict::Pass => "pass",
            Verdict::Fail => "fail",
            Verdict::Error => "error",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict of a single check run, with the extra terminal `NotApplicable` state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictState {
    #[default]
    None,
    Inconclusive,
    Pass,
    Fail,
    Error,
    /// Non-forced run abandoned on its first inconclusive escalation
    NotApplicable,
}

/// Effect of an escalation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Requested verdict is not more severe; nothing changes
    Stay,
    /// Verdict raised to the given severity
    Escalate(Verdict),
    /// Run is not applicable and must stop
    Halt,
}

impl VerdictState {
    /// Verdict reported for this state; `NotApplicable` reports `None`.
    pub fn verdict(self) -> Verdict {
        match self {
            VerdictState::None | VerdictState::NotApplicable => Verdict::None,
            VerdictState::Inconclusive => Verdict::Inconclusive,
            VerdictState::Pass => Verdict::Pass,
            VerdictState::Fail => Verdict::Fail,
            VerdictState::Error => Verdict::Error,
        }
    }

    pub fn is_applicable(self) -> bool {
        self != VerdictState::NotApplicable
    }

    /// Decide what a request to escalate to `requested` does.
    ///
    /// | current         | requested            | forced | result                 |
    /// |-----------------|----------------------|--------|------------------------|
    /// | `NotApplicable` | any                  | any    | `Stay`                 |
    /// | `None`          | `Inconclusive`       | no     | `Halt` (not applicable)|
    /// | any other       | more severe          | any    | `Escalate(requested)`  |
    /// | any other       | equal or less severe | any    | `Stay`                 |
    pub fn transition(self, requested: Verdict, forced: bool) -> Transition {
        match self {
            VerdictState::NotApplicable => Transition::Stay,
            VerdictState::None if requested == Verdict::Inconclusive && !forced => Transition::Halt,
            current if requested > current.verdict() => Transition::Escalate(requested),
            _ => Transition::Stay,
        }
    }

    /// Apply [`transition`](Self::transition) in place.
    pub fn apply(&mut self, requested: Verdict, forced: bool) -> Transition {
        let transition = self.transition(requested, forced);
        match transition {
            Transition::Stay => {}
            Transition::Escalate(verdict) => *self = verdict.into(),
            Transition::Halt => *self = VerdictState::NotApplicable,
        }
        transition
    }
}

impl From<Verdict> for VerdictState {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::None => VerdictState::None,
            Verdict::Inconclusive => VerdictState::Inconclusive,
            Verdict::Pass => VerdictState::Pass,
            Verdict::Fail => VerdictState::Fail,
            Verdict::Error => VerdictState::Error,
        }
    }
}

impl fmt::Display for VerdictState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerdictState::NotApplicable => f.write_str("not applicable"),
            other => other.verdict().fmt(f),
        }
    }
}
