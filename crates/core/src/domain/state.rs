use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::message::Message;
use crate::flows::PipelineState;

/// Sentinel category assigned when classification is skipped or the
/// collaborator returns a name outside the configured list.
pub const DEFAULT_CATEGORY: &str = "default";

/// Per-user conversation state, persisted between invocations and owned
/// exclusively by the processor while one message is in flight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub messages: Vec<Message>,
    pub category: Option<String>,
    pub missing_requirements: BTreeSet<String>,
    pub requirement_attempts: BTreeMap<String, u32>,
    pub confidence: Option<f64>,
    pub needs_escalation: bool,
    pub workflow_step: PipelineState,
}

impl Default for AgentState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            category: None,
            missing_requirements: BTreeSet::new(),
            requirement_attempts: BTreeMap::new(),
            confidence: None,
            needs_escalation: false,
            workflow_step: PipelineState::Start,
        }
    }
}

impl AgentState {
    /// Clears the fields an invocation derives from scratch. Message history
    /// and topic bookkeeping survive; confidence and escalation verdicts
    /// belong to exactly one invocation.
    pub fn begin_invocation(&mut self) {
        self.confidence = None;
        self.needs_escalation = false;
        self.missing_requirements.clear();
        self.workflow_step = PipelineState::Start;
    }

    /// Resets topic-scoped bookkeeping when a new conversation thread starts.
    pub fn reset_topic(&mut self) {
        self.category = None;
        self.missing_requirements.clear();
        self.requirement_attempts.clear();
    }

    pub fn record_requirement_attempt(&mut self, category: &str) {
        *self.requirement_attempts.entry(category.to_string()).or_insert(0) += 1;
    }

    /// The most recent user messages, oldest first, capped at `window`.
    pub fn recent_user_contents(&self, window: usize) -> Vec<&str> {
        let mut recent: Vec<&str> = self
            .messages
            .iter()
            .rev()
            .filter(|message| message.is_user())
            .take(window)
            .map(|message| message.content.as_str())
            .collect();
        recent.reverse();
        recent
    }

    /// The trailing slice of the conversation, capped at `window` messages.
    pub fn recent_messages(&self, window: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(window);
        &self.messages[start..]
    }
}
