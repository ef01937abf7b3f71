//! Structural message templates

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::number::encode_uint;
use crate::codec::{CoapMessage, CoapOption, Code, MessageType, OptionKind};

/// One field that did not match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    /// Dotted path of the field, e.g. `options.Token`
    pub field_path: String,
    pub expected: String,
    pub actual: String,
}

impl Mismatch {
    pub fn new(
        field_path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self { field_path: field_path.into(), expected: expected.into(), actual: actual.into() }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}, got {}", self.field_path, self.expected, self.actual)
    }
}

/// Result of comparing a message against a template; empty means the message matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    mismatches: Vec<Mismatch>,
}

impl MatchOutcome {
    pub fn matched() -> Self {
        Self::default()
    }

    pub fn mismatch(mismatch: Mismatch) -> Self {
        Self { mismatches: vec![mismatch] }
    }

    pub fn push(&mut self, mismatch: Mismatch) {
        self.mismatches.push(mismatch);
    }

    pub fn is_match(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn mismatches(&self) -> &[Mismatch] {
        &self.mismatches
    }
}

impl From<Vec<Mismatch>> for MatchOutcome {
    fn from(mismatches: Vec<Mismatch>) -> Self {
        Self { mismatches }
    }
}

/// Anything a decoded message can be structurally compared against.
pub trait Template {
    fn matches(&self, message: &CoapMessage) -> MatchOutcome;
}

impl<F> Template for F
where
    F: Fn(&CoapMessage) -> MatchOutcome,
{
    fn matches(&self, message: &CoapMessage) -> MatchOutcome {
        self(message)
    }
}

/// Constraint on the message code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePattern {
    Exact(Code),
    AnyRequest,
    AnyResponse,
    /// Any response of the class (2 = success, 4 = client error, ...)
    Class(u8),
}

impl CodePattern {
    fn accepts(self, code: Code) -> bool {
        match self {
            CodePattern::Exact(expected) => code == expected,
            CodePattern::AnyRequest => code.is_request(),
            CodePattern::AnyResponse => code.is_response(),
            CodePattern::Class(class) => code.is_response() && code.class() == class,
        }
    }
}

impl fmt::Display for CodePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodePattern::Exact(code) => write!(f, "{}", code),
            CodePattern::AnyRequest => f.write_str("any request code"),
            CodePattern::AnyResponse => f.write_str("any response code"),
            CodePattern::Class(class) => write!(f, "{}.xx", class),
        }
    }
}

/// Constraint on one option kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionPattern {
    Present(OptionKind),
    Absent(OptionKind),
    Value(OptionKind, Vec<u8>),
}

/// Builder-style template over the header fields, options and payload.
///
/// ```rust
/// use coapscope::check::{MessageTemplate, Template};
/// use coapscope::codec::{Code, CoapMessage, MessageType, OptionKind};
///
/// let template = MessageTemplate::new()
///     .mtype(MessageType::Acknowledgement)
///     .code(Code::CONTENT)
///     .token([7])
///     .option_absent(OptionKind::Observe);
///
/// let ack = CoapMessage::new(MessageType::Acknowledgement, Code::CONTENT, 1).with_token([7]);
/// assert!(template.matches(&ack).is_match());
///
/// let wrong = CoapMessage::new(MessageType::Acknowledgement, Code::NOT_FOUND, 1).with_token([7]);
/// assert_eq!(template.matches(&wrong).mismatches()[0].field_path, "code");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageTemplate {
    mtype: Option<MessageType>,
    code: Option<CodePattern>,
    message_id: Option<u16>,
    token: Option<Vec<u8>>,
    options: Vec<OptionPattern>,
    payload: Option<Vec<u8>>,
}

impl MessageTemplate {
    /// Template matching every message.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mtype(mut self, mtype: MessageType) -> Self {
        self.mtype = Some(mtype);
        self
    }

    pub fn code(mut self, code: Code) -> Self {
        self.code = Some(CodePattern::Exact(code));
        self
    }

    pub fn code_pattern(mut self, pattern: CodePattern) -> Self {
        self.code = Some(pattern);
        self
    }

    pub fn message_id(mut self, message_id: u16) -> Self {
        self.message_id = Some(message_id);
        self
    }

    pub fn token(mut self, token: impl Into<Vec<u8>>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn option_present(mut self, kind: OptionKind) -> Self {
        self.options.push(OptionPattern::Present(kind));
        self
    }

    pub fn option_absent(mut self, kind: OptionKind) -> Self {
        self.options.push(OptionPattern::Absent(kind));
        self
    }

    pub fn option_value(mut self, kind: OptionKind, value: impl Into<Vec<u8>>) -> Self {
        self.options.push(OptionPattern::Value(kind, value.into()));
        self
    }

    pub fn option_uint(self, kind: OptionKind, value: u32) -> Self {
        self.option_value(kind, encode_uint(value))
    }

    pub fn option_string(self, kind: OptionKind, value: &str) -> Self {
        self.option_value(kind, value.as_bytes())
    }

    pub fn payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    fn check_options(&self, message: &CoapMessage, outcome: &mut MatchOutcome) {
        for pattern in &self.options {
            match pattern {
                OptionPattern::Present(kind) if !message.options.contains(*kind) => {
                    outcome.push(Mismatch::new(option_path(*kind), "present", "absent"));
                }
                OptionPattern::Absent(kind) => {
                    if let Some(option) = message.option(*kind) {
                        outcome.push(Mismatch::new(option_path(*kind), "absent", describe(option)));
                    }
                }
                OptionPattern::Value(kind, expected) => match message.option(*kind) {
                    Some(option) if option.value == *expected => {}
                    Some(option) => {
                        outcome.push(Mismatch::new(option_path(*kind), hex(expected), describe(option)));
                    }
                    None => outcome.push(Mismatch::new(option_path(*kind), hex(expected), "absent")),
                },
                OptionPattern::Present(_) => {}
            }
        }
    }
}

impl Template for MessageTemplate {
    fn matches(&self, message: &CoapMessage) -> MatchOutcome {
        let mut outcome = MatchOutcome::matched();

        if let Some(mtype) = self.mtype {
            if message.mtype != mtype {
                outcome.push(Mismatch::new("type", mtype.to_string(), message.mtype.to_string()));
            }
        }
        if let Some(pattern) = self.code {
            if !pattern.accepts(message.code) {
                outcome.push(Mismatch::new("code", pattern.to_string(), message.code.to_string()));
            }
        }
        if let Some(message_id) = self.message_id {
            if message.message_id != message_id {
                outcome.push(Mismatch::new(
                    "message_id",
                    message_id.to_string(),
                    message.message_id.to_string(),
                ));
            }
        }
        if let Some(token) = &self.token {
            if message.token() != token.as_slice() {
                outcome.push(Mismatch::new(option_path(OptionKind::Token), hex(token), hex(message.token())));
            }
        }
        self.check_options(message, &mut outcome);
        if let Some(payload) = &self.payload {
            if message.payload != *payload {
                outcome.push(Mismatch::new(
                    "payload",
                    format!("{} bytes", payload.len()),
                    format!("{} bytes", message.payload.len()),
                ));
            }
        }
        outcome
    }
}

fn option_path(kind: OptionKind) -> String {
    format!("options.{}", kind.name())
}

fn describe(option: &CoapOption) -> String {
    if option.value.is_empty() { "empty".to_string() } else { hex(&option.value) }
}

fn hex(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "empty".to_string();
    }
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
