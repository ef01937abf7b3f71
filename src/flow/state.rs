//! Per endpoint-pair correlation state and the frame transition function

use std::collections::HashMap;
use std::net::SocketAddr;
use tracing::{debug, trace};

use super::conversation::{Conversation, ConversationId};
use crate::codec::{CoapMessage, MessageType, OptionKind};
use crate::types::Frame;

/// How the tracker sees a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClass {
    /// Method code, or a confirmable empty message (ping)
    Request,
    /// Response code
    Response,
    /// Empty acknowledgements/resets and reserved codes, only resolvable by message id
    Other,
    /// No decodable application layer
    NonConforming,
}

impl FrameClass {
    pub fn of(frame: &Frame) -> Self {
        match &frame.message {
            None => FrameClass::NonConforming,
            Some(message) if message.code.is_request() || message.is_ping() => FrameClass::Request,
            Some(message) if message.code.is_response() => FrameClass::Response,
            Some(_) => FrameClass::Other,
        }
    }
}

/// Where a frame ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Conversation(ConversationId),
    Ignored,
}

/// Block-wise continuation key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum BlockKey {
    /// Block1 upload, keyed by request token
    Token(Vec<u8>),
    /// Block2 download, keyed by request URI
    Uri(String),
}

/// Observation key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ObserveKey {
    Uri(String),
    Token(Vec<u8>),
}

#[derive(Debug, Clone, Copy)]
struct MessageIdEntry {
    conversation: ConversationId,
    expires_at: f64,
}

/// Correlation memory of one unordered endpoint pair.
#[derive(Debug, Default)]
pub struct FlowState {
    by_message_id: HashMap<u16, MessageIdEntry>,
    by_token: HashMap<Vec<u8>, ConversationId>,
    blocks: HashMap<BlockKey, ConversationId>,
    observations: HashMap<ObserveKey, ConversationId>,
    ignored: Vec<Frame>,
}

impl FlowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames of this flow that belong to no conversation.
    pub fn ignored(&self) -> &[Frame] {
        &self.ignored
    }

    pub(crate) fn into_ignored(self) -> Vec<Frame> {
        self.ignored
    }

    /// Apply one frame, in arrival order.
    ///
    /// New conversations are pushed onto `conversations`; their ids are indexes into it.
    /// `max_timeout` bounds how long a confirmable message id stays resolvable.
    pub fn append(
        &mut self,
        frame: Frame,
        conversations: &mut Vec<Conversation>,
        max_timeout: f64,
    ) -> Placement {
        let class = FrameClass::of(&frame);
        let Some(message) = frame.message.as_ref() else {
            debug!(frame = %frame.id, "Ignoring non-conforming frame");
            self.ignored.push(frame);
            return Placement::Ignored;
        };

        let mut resolved = match class {
            FrameClass::Request => {
                Some(self.resolve_request(message, frame.source, frame.destination, conversations))
            }
            FrameClass::Response => self.resolve_response(message, conversations),
            FrameClass::Other | FrameClass::NonConforming => None,
        };

        match message.mtype {
            MessageType::Confirmable => {
                if let Some(conversation) = resolved {
                    let expires_at = frame.timestamp + max_timeout;
                    self.by_message_id
                        .insert(message.message_id, MessageIdEntry { conversation, expires_at });
                }
            }
            MessageType::Acknowledgement | MessageType::Reset if resolved.is_none() => {
                resolved = self.lookup_message_id(message.message_id, frame.timestamp);
            }
            _ => {}
        }

        if message.mtype == MessageType::Reset {
            self.deactivate_observation(resolved, message.token(), conversations);
        }

        match resolved {
            Some(id) => {
                trace!(frame = %frame.id, conversation = id.0, "Frame appended to conversation");
                conversations[id.0].frames.push(frame);
                Placement::Conversation(id)
            }
            None => {
                trace!(frame = %frame.id, "Frame matches no conversation");
                self.ignored.push(frame);
                Placement::Ignored
            }
        }
    }

    fn resolve_request(
        &mut self,
        message: &CoapMessage,
        source: SocketAddr,
        destination: SocketAddr,
        conversations: &mut Vec<Conversation>,
    ) -> ConversationId {
        let token = message.token().to_vec();
        let uri = message.uri();

        if let Some(id) = self.continue_block_transfer(message, &token, &uri) {
            self.by_token.insert(token, id);
            conversations[id.0].uri = Some(uri);
            return id;
        }

        let id = if message.option(OptionKind::Observe).is_some() {
            let id = match self.observations.get(&ObserveKey::Uri(uri.clone())) {
                Some(&id) if conversations[id.0].observe_active => {
                    debug!(conversation = id.0, uri = %uri, "Observation request joins running observation");
                    id
                }
                _ => open_conversation(conversations, source, destination),
            };
            conversations[id.0].observe_active = true;
            self.observations.insert(ObserveKey::Uri(uri.clone()), id);
            self.observations.insert(ObserveKey::Token(token.clone()), id);
            id
        } else {
            let id = open_conversation(conversations, source, destination);
            self.by_token.insert(token.clone(), id);
            id
        };

        if message.block1().is_some_and(|block| block.more) {
            debug!(conversation = id.0, "Block1 transfer started");
            self.blocks.insert(BlockKey::Token(token), id);
        }

        conversations[id.0].uri = Some(uri);
        id
    }

    /// Continuation of a running block-wise transfer, retiring the entry on the last block.
    fn continue_block_transfer(
        &mut self,
        message: &CoapMessage,
        token: &[u8],
        uri: &str,
    ) -> Option<ConversationId> {
        let candidates = [
            message.block1().map(|block| (BlockKey::Token(token.to_vec()), block)),
            message.block2().map(|block| (BlockKey::Uri(uri.to_string()), block)),
        ];

        for (key, block) in candidates.into_iter().flatten() {
            if let Some(&id) = self.blocks.get(&key) {
                if !block.more {
                    debug!(conversation = id.0, block = block.num, "Block transfer entry retired");
                    self.blocks.remove(&key);
                }
                return Some(id);
            }
        }
        None
    }

    fn resolve_response(
        &mut self,
        message: &CoapMessage,
        conversations: &[Conversation],
    ) -> Option<ConversationId> {
        let token = message.token();
        let id = self
            .by_token
            .get(token)
            .or_else(|| self.observations.get(&ObserveKey::Token(token.to_vec())))
            .copied()?;

        if let Some(block) = message.block2() {
            if block.more {
                if let Some(uri) = conversations[id.0].uri.clone() {
                    debug!(conversation = id.0, block = block.num, uri = %uri, "Block2 transfer continues");
                    self.blocks.insert(BlockKey::Uri(uri), id);
                }
            }
        }
        Some(id)
    }

    fn lookup_message_id(&mut self, message_id: u16, timestamp: f64) -> Option<ConversationId> {
        let entry = *self.by_message_id.get(&message_id)?;
        if timestamp > entry.expires_at {
            debug!(message_id, expired_at = entry.expires_at, "Message id entry expired");
            self.by_message_id.remove(&message_id);
            return None;
        }
        Some(entry.conversation)
    }

    // Both the resolved conversation and the one observed under the reset's token are
    // cleared; they usually coincide.
    fn deactivate_observation(
        &self,
        resolved: Option<ConversationId>,
        token: &[u8],
        conversations: &mut [Conversation],
    ) {
        if let Some(id) = resolved {
            conversations[id.0].observe_active = false;
        }
        if let Some(&id) = self.observations.get(&ObserveKey::Token(token.to_vec())) {
            debug!(conversation = id.0, "Observation cancelled by reset");
            conversations[id.0].observe_active = false;
        }
    }
}

fn open_conversation(
    conversations: &mut Vec<Conversation>,
    client: SocketAddr,
    server: SocketAddr,
) -> ConversationId {
    let id = ConversationId(conversations.len());
    debug!(conversation = id.0, %client, %server, "Opening conversation");
    conversations.push(Conversation::open(id, client, server));
    id
}
