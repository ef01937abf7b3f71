//! Captured frame type

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use tracing::warn;

use super::EndpointPair;
use crate::codec::CoapMessage;

/// Sequence number of a frame within its capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameId(pub u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One captured datagram with its decoded CoAP message.
///
/// This is the fundamental data unit that flows through the analyser.
/// Frames are created once by the dissector and never modified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// Capture sequence number
    pub id: FrameId,

    /// Capture timestamp in seconds
    pub timestamp: f64,

    /// Sending endpoint
    pub source: SocketAddr,

    /// Receiving endpoint
    pub destination: SocketAddr,

    /// Decoded application-layer message, absent when decoding failed
    pub message: Option<CoapMessage>,

    /// Why the message could not be decoded
    pub decode_error: Option<String>,
}

impl Frame {
    /// Create a frame from an already decoded message
    pub fn new(
        id: u64,
        timestamp: f64,
        source: SocketAddr,
        destination: SocketAddr,
        message: CoapMessage,
    ) -> Self {
        Self {
            id: FrameId(id),
            timestamp,
            source,
            destination,
            message: Some(message),
            decode_error: None,
        }
    }

    /// Create a frame from a raw UDP payload, recording the decode error on failure.
    pub fn from_datagram(
        id: u64,
        timestamp: f64,
        source: SocketAddr,
        destination: SocketAddr,
        payload: &[u8],
    ) -> Self {
        match CoapMessage::decode(payload) {
            Ok(message) => Self::new(id, timestamp, source, destination, message),
            Err(e) => {
                warn!(frame = id, "Frame is not a valid CoAP message: {}", e);
                Self::undecodable(id, timestamp, source, destination, e.to_string())
            }
        }
    }

    /// Create a frame whose application layer could not be decoded
    pub fn undecodable(
        id: u64,
        timestamp: f64,
        source: SocketAddr,
        destination: SocketAddr,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: FrameId(id),
            timestamp,
            source,
            destination,
            message: None,
            decode_error: Some(error.into()),
        }
    }

    /// Unordered endpoint pair this frame travels on
    pub fn pair(&self) -> EndpointPair {
        EndpointPair::new(self.source, self.destination)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{:.6}] {} -> {} ", self.id, self.timestamp, self.source, self.destination)?;
        match (&self.message, &self.decode_error) {
            (Some(message), _) => write!(f, "{}", message),
            (None, Some(error)) => write!(f, "undecodable: {}", error),
            (None, None) => f.write_str("undecodable"),
        }
    }
}
