use std::collections::HashMap;

use thiserror::Error;

use concierge_core::{AgentState, Message};

/// Response produced by a custom handler or the escalation routine. Used
/// verbatim: the confidence gate does not re-inspect it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandlerResponse {
    pub messages: Vec<Message>,
}

impl HandlerResponse {
    pub fn from_text(content: impl Into<String>) -> Self {
        Self { messages: vec![Message::assistant(content)] }
    }
}

pub trait Handler: Send + Sync {
    fn handle(&self, state: &AgentState) -> HandlerResponse;
}

impl<F> Handler for F
where
    F: Fn(&AgentState) -> HandlerResponse + Send + Sync,
{
    fn handle(&self, state: &AgentState) -> HandlerResponse {
        self(state)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HandlerRegistryError {
    #[error("handler category must be a non-empty string")]
    EmptyCategory,
    #[error("handler for category `{0}` is already registered")]
    DuplicateCategory(String),
}

/// Category → handler dispatch table. A missing entry is the defined
/// "no handler" branch that routes to the default response.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Box<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        category: impl Into<String>,
        handler: impl Handler + 'static,
    ) -> Result<(), HandlerRegistryError> {
        let category = category.into();
        if category.trim().is_empty() {
            return Err(HandlerRegistryError::EmptyCategory);
        }
        if self.handlers.contains_key(&category) {
            return Err(HandlerRegistryError::DuplicateCategory(category));
        }
        self.handlers.insert(category, Box::new(handler));
        Ok(())
    }

    pub fn unregister(&mut self, category: &str) {
        self.handlers.remove(category);
    }

    pub fn get(&self, category: &str) -> Option<&dyn Handler> {
        self.handlers.get(category).map(Box::as_ref)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
