//! Core types shared by the tracker, the check engine and the aggregator.
//!
//! - [`Frame`] is one captured datagram with its decoded message (or decode error)
//! - [`EndpointPair`] is the unordered transport endpoint pair a flow is keyed by
//! - [`HostPair`] is the ordered (client, server) host pair conversations are linked by
//!
//! ## Usage Example
//!
//! ```rust
//! use coapscope::codec::{Code, CoapMessage, MessageType};
//! use coapscope::types::{EndpointPair, Frame};
//!
//! let client = "[::1]:40000".parse().unwrap();
//! let server = "[::1]:5683".parse().unwrap();
//!
//! let request = CoapMessage::new(MessageType::Confirmable, Code::GET, 1).with_token([7]);
//! let frame = Frame::new(1, 0.0, client, server, request);
//! assert_eq!(frame.pair(), EndpointPair::new(server, client));
//!
//! let noise = Frame::from_datagram(2, 0.1, client, server, &[0xFF]);
//! assert!(noise.message.is_none() && noise.decode_error.is_some());
//! ```

mod endpoint;
mod frame;

pub use endpoint::{EndpointPair, HostPair};
pub use frame::{Frame, FrameId};
