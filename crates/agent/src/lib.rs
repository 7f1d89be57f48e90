//! Conversation processing for knowledge-backed agents.
//!
//! One incoming user message runs through a fixed pipeline: thread
//! continuity check, category classification, requirement validation,
//! handler or default-response routing, confidence scoring and escalation,
//! then persistence. The pipeline is an explicit state machine
//! (`concierge_core::flows`); the stages in this crate do the work at each
//! state.
//!
//! # Key types
//!
//! - `ConversationProcessor` - the orchestrator (see `processor`)
//! - `LlmClient` - pluggable completion collaborator with an HTTP impl
//! - `StateStore` - per-user conversation state persistence seam
//! - `HandlerRegistry` - category to custom-handler dispatch
//!
//! # Degradation principle
//!
//! A collaborator failure never aborts an invocation. Every LLM-calling
//! stage maps failure to a safe default and the user always receives a
//! response, degraded rather than absent.

pub mod handlers;
pub mod llm;
pub mod processor;
pub mod profile;
pub mod prompts;
pub mod stages;
pub mod store;
pub mod tools;

pub use handlers::{Handler, HandlerRegistry, HandlerRegistryError, HandlerResponse};
pub use llm::{HttpLlmClient, LlmClient};
pub use processor::{ConversationProcessor, ProcessorError};
pub use profile::AgentProfile;
pub use prompts::PromptTemplates;
pub use stages::confidence::{
    ConfidenceModel, Escalation, LengthHeuristic, TeamReviewEscalation,
};
pub use store::{InMemoryStateStore, StateStore, StateStoreError};
pub use tools::{Tool, ToolError, ToolRegistry};
