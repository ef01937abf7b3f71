//! Capture-level frame partitioning

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use super::conversation::{Conversation, ConversationId};
use super::state::{FlowState, Placement};
use crate::config::AnalysisConfig;
use crate::types::{EndpointPair, Frame, HostPair};

/// Result of tracking a whole capture.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackedCapture {
    /// Conversations in creation order
    pub conversations: Vec<Conversation>,
    /// Frames that joined no conversation, in capture order
    pub ignored: Vec<Frame>,
}

impl TrackedCapture {
    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.get(id.0)
    }

    pub fn frame_count(&self) -> usize {
        self.ignored.len() + self.conversations.iter().map(Conversation::len).sum::<usize>()
    }
}

/// Partitions frames into conversations, one [`FlowState`] per endpoint pair.
///
/// Frames must be appended in capture order; message-id expiry is driven by frame
/// timestamps only.
#[derive(Debug)]
pub struct FlowTracker {
    flows: HashMap<EndpointPair, FlowState>,
    conversations: Vec<Conversation>,
    max_timeout: f64,
    link_conversations: bool,
}

impl FlowTracker {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            flows: HashMap::new(),
            conversations: Vec::new(),
            max_timeout: config.max_timeout(),
            link_conversations: config.link_conversations,
        }
    }

    /// Tracker with default settings and a custom message-id lifetime.
    pub fn with_max_timeout(max_timeout: f64) -> Self {
        Self { max_timeout, ..Self::new(&AnalysisConfig::default()) }
    }

    pub fn max_timeout(&self) -> f64 {
        self.max_timeout
    }

    pub fn append(&mut self, frame: Frame) -> Placement {
        let state = self.flows.entry(frame.pair()).or_default();
        state.append(frame, &mut self.conversations, self.max_timeout)
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }

    pub fn finish(self) -> TrackedCapture {
        let mut conversations = self.conversations;
        if self.link_conversations {
            link(&mut conversations);
        }

        let mut ignored: Vec<Frame> =
            self.flows.into_values().flat_map(FlowState::into_ignored).collect();
        ignored.sort_by_key(|frame| frame.id);

        info!(
            conversations = conversations.len(),
            ignored = ignored.len(),
            "Capture tracked"
        );
        TrackedCapture { conversations, ignored }
    }
}

// Each conversation points at the next one opened between the same two hosts.
fn link(conversations: &mut [Conversation]) {
    let mut last: HashMap<HostPair, ConversationId> = HashMap::new();
    for index in 0..conversations.len() {
        let hosts = conversations[index].hosts();
        let id = conversations[index].id;
        if let Some(previous) = last.insert(hosts, id) {
            debug!(from = previous.0, to = id.0, %hosts, "Linking conversations");
            conversations[previous.0].next = Some(id);
        }
    }
}

/// Track a whole capture in one call.
pub fn track<I>(frames: I, config: &AnalysisConfig) -> TrackedCapture
where
    I: IntoIterator<Item = Frame>,
{
    let mut tracker = FlowTracker::new(config);
    for frame in frames {
        tracker.append(frame);
    }
    tracker.finish()
}
