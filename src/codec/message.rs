//! CoAP message header and message-level accessors
//!
//! ## Message Layout
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |Ver| T |  OC   |      Code     |          Message ID           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |   Options (if any) ...
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |   Payload (if any) ...
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! The token travels as an option; the payload is everything after the option chain.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

use super::number::{BlockValue, OptionKind, decode_uint};
use super::option::{CoapOption, OptionList, decode_options, encode_options};
use crate::{AnalysisError, Result};

/// Protocol version carried in every header.
pub const VERSION: u8 = 1;

/// Size of the fixed message header in bytes.
pub const HEADER_SIZE: usize = 4;

/// Message type (delivery kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    Confirmable,
    NonConfirmable,
    Acknowledgement,
    Reset,
}

impl MessageType {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => MessageType::Confirmable,
            1 => MessageType::NonConfirmable,
            2 => MessageType::Acknowledgement,
            _ => MessageType::Reset,
        }
    }

    pub const fn bits(self) -> u8 {
        match self {
            MessageType::Confirmable => 0,
            MessageType::NonConfirmable => 1,
            MessageType::Acknowledgement => 2,
            MessageType::Reset => 3,
        }
    }

    pub const fn abbreviation(self) -> &'static str {
        match self {
            MessageType::Confirmable => "CON",
            MessageType::NonConfirmable => "NON",
            MessageType::Acknowledgement => "ACK",
            MessageType::Reset => "RST",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// Message code, `class.detail` with a 3-bit class and 5-bit detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Code(pub u8);

impl Code {
    pub const EMPTY: Code = Code(0);
    pub const GET: Code = Code(1);
    pub const POST: Code = Code(2);
    pub const PUT: Code = Code(3);
    pub const DELETE: Code = Code(4);
    pub const CREATED: Code = Code::response(2, 1);
    pub const DELETED: Code = Code::response(2, 2);
    pub const VALID: Code = Code::response(2, 3);
    pub const CHANGED: Code = Code::response(2, 4);
    pub const CONTENT: Code = Code::response(2, 5);
    pub const CONTINUE: Code = Code::response(2, 31);
    pub const BAD_REQUEST: Code = Code::response(4, 0);
    pub const NOT_FOUND: Code = Code::response(4, 4);
    pub const REQUEST_ENTITY_INCOMPLETE: Code = Code::response(4, 8);
    pub const INTERNAL_SERVER_ERROR: Code = Code::response(5, 0);

    pub const fn response(class: u8, detail: u8) -> Code {
        Code((class << 5) | (detail & 0x1F))
    }

    pub const fn class(self) -> u8 {
        self.0 >> 5
    }

    pub const fn detail(self) -> u8 {
        self.0 & 0x1F
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Method codes 0.01 - 0.31.
    pub const fn is_request(self) -> bool {
        self.0 >= 1 && self.0 <= 31
    }

    /// Response codes 2.00 - 5.31.
    pub const fn is_response(self) -> bool {
        self.0 >= 64 && self.0 <= 191
    }

    pub const fn method_name(self) -> Option<&'static str> {
        match self.0 {
            1 => Some("GET"),
            2 => Some("POST"),
            3 => Some("PUT"),
            4 => Some("DELETE"),
            _ => None,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.method_name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}.{:02}", self.class(), self.detail()),
        }
    }
}

/// A decoded CoAP message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoapMessage {
    pub mtype: MessageType,
    pub code: Code,
    pub message_id: u16,
    pub options: OptionList,
    pub payload: Vec<u8>,
}

impl CoapMessage {
    /// Create a message without options or payload.
    pub fn new(mtype: MessageType, code: Code, message_id: u16) -> Self {
        Self { mtype, code, message_id, options: OptionList::new(), payload: Vec::new() }
    }

    pub fn with_option(mut self, option: CoapOption) -> Self {
        self.options = self.options.with(option);
        self
    }

    pub fn with_token(self, token: impl Into<Vec<u8>>) -> Self {
        self.with_option(CoapOption::with_kind(OptionKind::Token, token))
    }

    /// Add one Uri-Path option per `/`-separated segment.
    pub fn with_uri_path(self, path: &str) -> Self {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self, |message, segment| {
                message.with_option(CoapOption::string(OptionKind::UriPath, segment))
            })
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Decode a message from a UDP datagram payload.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(AnalysisError::decode(
                "Message header",
                0,
                format!("need {} header bytes, have {}", HEADER_SIZE, data.len()),
            ));
        }

        let version = data[0] >> 6;
        if version != VERSION {
            return Err(AnalysisError::decode(
                "Message header",
                0,
                format!("unsupported version {} (expected {})", version, VERSION),
            ));
        }

        let mtype = MessageType::from_bits(data[0] >> 4);
        let option_count = data[0] & 0x0F;
        let code = Code(data[1]);
        let message_id = u16::from_be_bytes([data[2], data[3]]);

        let (options, payload) =
            decode_options(&data[HEADER_SIZE..], Some(option_count)).map_err(|e| match e {
                AnalysisError::Decode { context, offset, details } => {
                    AnalysisError::Decode { context, offset: offset + HEADER_SIZE, details }
                }
                other => other,
            })?;

        trace!(
            mtype = %mtype,
            code = %code,
            message_id,
            options = options.len(),
            payload = payload.len(),
            "Decoded message"
        );

        Ok(Self { mtype, code, message_id, options, payload: payload.to_vec() })
    }

    /// Encode the message, filling in the option count field.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let (option_bytes, option_count) = encode_options(&self.options)?;
        let mut out = Vec::with_capacity(HEADER_SIZE + option_bytes.len() + self.payload.len());
        out.push((VERSION << 6) | (self.mtype.bits() << 4) | option_count);
        out.push(self.code.0);
        out.extend_from_slice(&self.message_id.to_be_bytes());
        out.extend_from_slice(&option_bytes);
        out.extend_from_slice(&self.payload);
        Ok(out)
    }

    pub fn option(&self, kind: OptionKind) -> Option<&CoapOption> {
        self.options.get(kind)
    }

    /// Token bytes (empty when the message carries no Token option).
    pub fn token(&self) -> &[u8] {
        self.option(OptionKind::Token).map(|o| o.value.as_slice()).unwrap_or(&[])
    }

    /// Request URI built from the Uri-Path and Uri-Query options.
    pub fn uri(&self) -> String {
        let mut uri = String::from("/");
        let segments: Vec<String> = self
            .options
            .all(OptionKind::UriPath)
            .map(|o| String::from_utf8_lossy(&o.value).into_owned())
            .collect();
        uri.push_str(&segments.join("/"));

        let queries: Vec<String> = self
            .options
            .all(OptionKind::UriQuery)
            .map(|o| String::from_utf8_lossy(&o.value).into_owned())
            .collect();
        if !queries.is_empty() {
            uri.push('?');
            uri.push_str(&queries.join("&"));
        }
        uri
    }

    pub fn observe(&self) -> Option<u32> {
        self.option(OptionKind::Observe).and_then(|o| decode_uint(&o.value))
    }

    pub fn block1(&self) -> Option<BlockValue> {
        self.block(OptionKind::Block1)
    }

    pub fn block2(&self) -> Option<BlockValue> {
        self.block(OptionKind::Block2)
    }

    fn block(&self, kind: OptionKind) -> Option<BlockValue> {
        self.option(kind).and_then(|o| decode_uint(&o.value)).map(BlockValue::from_uint)
    }

    /// Code 0.00 with a confirmable type: a ping eliciting a reset.
    pub fn is_ping(&self) -> bool {
        self.code.is_empty() && self.mtype == MessageType::Confirmable
    }

    pub fn is_empty_ack(&self) -> bool {
        self.code.is_empty() && self.mtype == MessageType::Acknowledgement
    }
}

impl fmt::Display for CoapMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} mid={}", self.mtype, self.code, self.message_id)?;
        let token = self.token();
        if !token.is_empty() {
            write!(f, " tok=")?;
            for byte in token {
                write!(f, "{:02x}", byte)?;
            }
        }
        if self.code.is_request() {
            write!(f, " {}", self.uri())?;
        }
        Ok(())
    }
}
