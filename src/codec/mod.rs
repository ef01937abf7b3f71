//! CoAP wire codec (cross-platform, allocation-light)
//!
//! - [`option`] encodes and decodes delta-compressed option chains
//! - [`message`] handles the fixed header and exposes message-level accessors
//! - [`number`] is the option registry with opaque fallback for unknown numbers

pub mod message;
pub mod number;
pub mod option;

pub use message::{Code, CoapMessage, MessageType};
pub use number::{BlockValue, OptionFormat, OptionKind};
pub use option::{CoapOption, OptionList, decode_options, encode_options};
