//! Conversation records produced by the flow tracker

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

use crate::types::{EndpointPair, Frame, FrameId, HostPair};

/// Index of a conversation in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub usize);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conversation {}", self.0)
    }
}

/// One logical exchange: a request/response, an observation or a block-wise transfer.
///
/// Created on the first request-like frame that matches nothing in progress; frames are
/// only ever appended afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    /// Flow the conversation belongs to
    pub pair: EndpointPair,
    /// Sender of the opening request
    pub client: SocketAddr,
    /// Receiver of the opening request
    pub server: SocketAddr,
    /// Member frames in arrival order
    pub frames: Vec<Frame>,
    /// Observation still running (cleared by a reset)
    pub observe_active: bool,
    /// URI of the latest request, used for block-wise continuation
    pub uri: Option<String>,
    /// Next conversation between the same client and server hosts
    pub next: Option<ConversationId>,
}

impl Conversation {
    pub(crate) fn open(id: ConversationId, client: SocketAddr, server: SocketAddr) -> Self {
        Self {
            id,
            pair: EndpointPair::new(client, server),
            client,
            server,
            frames: Vec::new(),
            observe_active: false,
            uri: None,
            next: None,
        }
    }

    pub fn hosts(&self) -> HostPair {
        HostPair::new(self.client.ip(), self.server.ip())
    }

    pub fn frame_ids(&self) -> impl Iterator<Item = FrameId> + '_ {
        self.frames.iter().map(|f| f.id)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl fmt::Display for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {} ({} frames", self.id, self.client, self.server, self.frames.len())?;
        if let Some(uri) = &self.uri {
            write!(f, ", {}", uri)?;
        }
        f.write_str(")")
    }
}
