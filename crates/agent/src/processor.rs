use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, warn};

use concierge_core::{
    AgentState, CategoryRequirement, Message, PipelineConfig, PipelineContext, PipelineEngine,
    PipelineEvent, PipelineState, PipelineTransitionError,
};
use concierge_knowledge::KnowledgeManager;

use crate::handlers::HandlerRegistry;
use crate::llm::LlmClient;
use crate::profile::AgentProfile;
use crate::prompts::PromptTemplates;
use crate::stages::classify::classify;
use crate::stages::confidence::{ConfidenceModel, Escalation, LengthHeuristic, TeamReviewEscalation};
use crate::stages::respond::default_response;
use crate::stages::thread::{detect_thread, ThreadVerdict};
use crate::stages::validate::{ask_for_missing, missing_requirements};
use crate::store::StateStore;
use crate::tools::ToolRegistry;

const EMPTY_RESPONSE: &str = "I apologize, but I couldn't process your request.";

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("user id must not be empty")]
    EmptyUserId,
    #[error(transparent)]
    Flow(#[from] PipelineTransitionError),
}

/// Runs one message through the conversation pipeline, end to end, for one
/// user. Invocations for the same user id are fully serialized through a
/// per-key lock; different users proceed concurrently.
pub struct ConversationProcessor {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn StateStore>,
    knowledge: Option<Arc<KnowledgeManager>>,
    handlers: HandlerRegistry,
    tools: ToolRegistry,
    templates: PromptTemplates,
    profile: AgentProfile,
    confidence: Box<dyn ConfidenceModel>,
    escalation: Box<dyn Escalation>,
    pipeline: PipelineConfig,
    engine: PipelineEngine,
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConversationProcessor {
    pub fn new(
        profile: AgentProfile,
        pipeline: PipelineConfig,
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        let confidence = Box::new(LengthHeuristic::new(pipeline.response_length_ceiling));
        Self {
            llm,
            store,
            knowledge: None,
            handlers: HandlerRegistry::new(),
            tools: ToolRegistry::new(),
            templates: PromptTemplates::default(),
            profile,
            confidence,
            escalation: Box::new(TeamReviewEscalation),
            pipeline,
            engine: PipelineEngine::default(),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_knowledge(mut self, knowledge: Arc<KnowledgeManager>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn with_handlers(mut self, handlers: HandlerRegistry) -> Self {
        for category in handlers.categories() {
            if !self.profile.categories.is_empty()
                && !self.profile.categories.iter().any(|known| known == category)
            {
                warn!(
                    category,
                    "handler registered for a category outside the classification list; \
                     it may never be called"
                );
            }
        }
        self.handlers = handlers;
        self
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_templates(mut self, templates: PromptTemplates) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_confidence_model(mut self, model: Box<dyn ConfidenceModel>) -> Self {
        self.confidence = model;
        self
    }

    pub fn with_escalation(mut self, escalation: Box<dyn Escalation>) -> Self {
        self.escalation = escalation;
        self
    }

    pub async fn process(&self, user_id: &str, message: &str) -> Result<String, ProcessorError> {
        let user_id = user_id.trim();
        let message = message.trim();
        if user_id.is_empty() {
            return Err(ProcessorError::EmptyUserId);
        }
        if message.is_empty() {
            return Err(ProcessorError::EmptyMessage);
        }

        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let mut state = match self.store.get(user_id).await {
            Ok(Some(state)) => state,
            Ok(None) => AgentState::default(),
            Err(store_error) => {
                // The corrupt record stays in the store for inspection; a
                // fresh state shadows it until the next successful persist.
                warn!(user_id, error = %store_error, "persisted state unusable, starting fresh");
                AgentState::default()
            }
        };
        state.begin_invocation();

        let mut context = PipelineContext {
            confidence_threshold: self.profile.confidence_threshold,
            ..PipelineContext::default()
        };
        let mut cursor = self.engine.initial_state();
        let mut responses: Vec<Message> = Vec::new();

        // THREAD_CHECK: only when prior conversation exists.
        if state.messages.iter().any(Message::is_user) {
            cursor =
                self.advance(cursor, PipelineEvent::PriorStateLoaded, &context, &mut state)?;
            let verdict = detect_thread(
                self.llm.as_ref(),
                &self.templates,
                &state,
                message,
                self.pipeline.thread_window,
            )
            .await;
            if verdict == ThreadVerdict::New {
                state.reset_topic();
            }
            cursor = self.advance(cursor, PipelineEvent::TopicResolved, &context, &mut state)?;
        } else {
            cursor =
                self.advance(cursor, PipelineEvent::FreshConversation, &context, &mut state)?;
        }

        // CLASSIFY
        let category =
            classify(self.llm.as_ref(), &self.templates, message, &self.profile.categories).await;
        state.category = Some(category.clone());
        cursor = self.advance(cursor, PipelineEvent::CategoryAssigned, &context, &mut state)?;

        // VALIDATE
        let requirement = CategoryRequirement::find(&self.profile.requirements, &category);
        let missing = missing_requirements(
            self.llm.as_ref(),
            &self.templates,
            &state,
            message,
            requirement,
            self.pipeline.context_window,
        )
        .await;
        state.missing_requirements = missing.clone();
        context.missing_requirements = missing.iter().cloned().collect();

        if !missing.is_empty() {
            // ASK_INFO: short-circuit past routing and confidence.
            state.record_requirement_attempt(&category);
            cursor =
                self.advance(cursor, PipelineEvent::RequirementsMissing, &context, &mut state)?;
            responses.push(Message::assistant(ask_for_missing(&missing)));
            cursor = self.advance(cursor, PipelineEvent::InfoRequested, &context, &mut state)?;
        } else {
            cursor =
                self.advance(cursor, PipelineEvent::RequirementsSatisfied, &context, &mut state)?;

            if let Some(handler) = self.handlers.get(&category) {
                // HANDLER: trusted verbatim, no confidence gate.
                cursor =
                    self.advance(cursor, PipelineEvent::HandlerMatched, &context, &mut state)?;
                let handled = handler.handle(&state);
                responses.extend(handled.messages);
                cursor =
                    self.advance(cursor, PipelineEvent::HandlerCompleted, &context, &mut state)?;
            } else {
                // DEFAULT_RESPONSE
                cursor =
                    self.advance(cursor, PipelineEvent::NoHandlerRegistered, &context, &mut state)?;
                let knowledge_block = match &self.knowledge {
                    Some(manager) => {
                        manager.retrieve_for_query(message, manager.default_max_results()).await
                    }
                    None => String::new(),
                };
                let reply = default_response(
                    self.llm.as_ref(),
                    &self.templates,
                    &self.profile.personality,
                    &knowledge_block,
                    &self.tools.names(),
                    &state,
                    message,
                )
                .await;
                cursor =
                    self.advance(cursor, PipelineEvent::ResponseGenerated, &context, &mut state)?;

                // CONFIDENCE
                let score = self.confidence.score(&reply);
                state.confidence = Some(score);
                context.confidence = Some(score);

                if score < self.profile.confidence_threshold {
                    state.needs_escalation = true;
                    cursor = self.advance(
                        cursor,
                        PipelineEvent::ConfidenceRejected,
                        &context,
                        &mut state,
                    )?;
                    let escalated = self.escalation.escalate(&state);
                    responses.extend(escalated.messages);
                    cursor = self.advance(
                        cursor,
                        PipelineEvent::EscalationCompleted,
                        &context,
                        &mut state,
                    )?;
                } else {
                    responses.push(Message::assistant(reply));
                    cursor = self.advance(
                        cursor,
                        PipelineEvent::ConfidenceAccepted,
                        &context,
                        &mut state,
                    )?;
                }
            }
        }

        // PERSIST
        state.messages.push(Message::user(message));
        state.messages.extend(responses.iter().cloned());
        if let Err(store_error) = self.store.put(user_id, &state).await {
            error!(user_id, error = %store_error, "conversation state could not be persisted");
        }
        self.advance(cursor, PipelineEvent::StatePersisted, &context, &mut state)?;

        let reply = responses
            .last()
            .map(|message| message.content.clone())
            .unwrap_or_else(|| EMPTY_RESPONSE.to_string());
        Ok(reply)
    }

    /// Applies one guarded transition and records the stage on the state,
    /// except for the terminal bookkeeping states: `workflow_step` keeps the
    /// stage that produced the invocation's response.
    fn advance(
        &self,
        cursor: PipelineState,
        event: PipelineEvent,
        context: &PipelineContext,
        state: &mut AgentState,
    ) -> Result<PipelineState, ProcessorError> {
        let outcome = self.engine.apply(&cursor, &event, context)?;
        if !matches!(outcome.to, PipelineState::Persist | PipelineState::End) {
            state.workflow_step = outcome.to;
        }
        Ok(outcome.to)
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        locks.entry(user_id.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }
}
