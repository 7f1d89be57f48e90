use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use concierge_core::AgentState;

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("persisted state for `{user_id}` is corrupt: {detail}")]
    Corrupt { user_id: String, detail: String },
    #[error("state store backend failure: {0}")]
    Backend(String),
}

/// Per-user conversation state persistence. Distinct user ids never observe
/// each other's state.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<AgentState>, StateStoreError>;
    async fn put(&self, user_id: &str, state: &AgentState) -> Result<(), StateStoreError>;
}

/// Stores states as serialized JSON, the same shape an external backend
/// would hold. Decoding happens on read, so a corrupt record surfaces as
/// `StateStoreError::Corrupt` rather than poisoning the process.
#[derive(Default)]
pub struct InMemoryStateStore {
    states: RwLock<HashMap<String, String>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a raw record without validation. Exists so corruption handling
    /// can be exercised; a real backend can always hold bad bytes.
    pub async fn insert_raw(&self, user_id: impl Into<String>, raw: impl Into<String>) {
        let mut states = self.states.write().await;
        states.insert(user_id.into(), raw.into());
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, user_id: &str) -> Result<Option<AgentState>, StateStoreError> {
        let states = self.states.read().await;
        match states.get(user_id) {
            Some(raw) => serde_json::from_str(raw).map(Some).map_err(|error| {
                StateStoreError::Corrupt { user_id: user_id.to_string(), detail: error.to_string() }
            }),
            None => Ok(None),
        }
    }

    async fn put(&self, user_id: &str, state: &AgentState) -> Result<(), StateStoreError> {
        let encoded = serde_json::to_string(state)
            .map_err(|error| StateStoreError::Backend(error.to_string()))?;
        let mut states = self.states.write().await;
        states.insert(user_id.to_string(), encoded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use concierge_core::{AgentState, Message};

    use super::{InMemoryStateStore, StateStore, StateStoreError};

    #[tokio::test]
    async fn state_round_trips_per_user() {
        let store = InMemoryStateStore::new();
        let mut state = AgentState::default();
        state.messages.push(Message::user("I need a refund"));
        state.category = Some("BillingQuestion".to_string());

        store.put("alice", &state).await.expect("put state");
        let found = store.get("alice").await.expect("get state");

        assert_eq!(found, Some(state));
        assert_eq!(store.get("bob").await.expect("get other user"), None);
    }

    #[tokio::test]
    async fn corrupt_record_is_a_typed_error() {
        let store = InMemoryStateStore::new();
        store.insert_raw("alice", "{ not json at all").await;

        let error = store.get("alice").await.expect_err("corrupt record");
        assert!(matches!(error, StateStoreError::Corrupt { ref user_id, .. } if user_id == "alice"));
    }

    #[tokio::test]
    async fn put_overwrites_the_previous_record() {
        let store = InMemoryStateStore::new();
        let mut state = AgentState::default();
        store.put("alice", &state).await.expect("first put");

        state.messages.push(Message::user("hello"));
        store.put("alice", &state).await.expect("second put");

        let found = store.get("alice").await.expect("get state").expect("state exists");
        assert_eq!(found.messages.len(), 1);
    }
}
