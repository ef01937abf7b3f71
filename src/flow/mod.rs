//! Conversation tracking
//!
//! Frames are partitioned per unordered endpoint pair. Each pair owns a [`FlowState`]
//! holding four correlation tables (message id, token, block-wise continuation and
//! observation); every frame either extends or opens a [`Conversation`], or is ignored.
//!
//! ```rust
//! use coapscope::AnalysisConfig;
//! use coapscope::codec::{Code, CoapMessage, MessageType};
//! use coapscope::flow::track;
//! use coapscope::types::Frame;
//!
//! let client = "10.0.0.1:40000".parse().unwrap();
//! let server = "10.0.0.2:5683".parse().unwrap();
//! let request = CoapMessage::new(MessageType::Confirmable, Code::GET, 7).with_token([1]);
//! let response = CoapMessage::new(MessageType::Acknowledgement, Code::CONTENT, 7).with_token([1]);
//!
//! let capture = track(
//!     [Frame::new(1, 0.0, client, server, request), Frame::new(2, 0.1, server, client, response)],
//!     &AnalysisConfig::default(),
//! );
//! assert_eq!(capture.conversations.len(), 1);
//! assert!(capture.ignored.is_empty());
//! ```

mod conversation;
mod state;
mod tracker;

pub use conversation::{Conversation, ConversationId};
pub use state::{FlowState, FrameClass, Placement};
pub use tracker::{FlowTracker, TrackedCapture, track};
