use serde::{Deserialize, Serialize};

/// Named stages of one conversation invocation. Transitions only ever move
/// forward within an invocation; the next message starts again from `Start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Start,
    ThreadCheck,
    Classify,
    Validate,
    AskInfo,
    Route,
    Handler,
    DefaultResponse,
    Confidence,
    Escalate,
    Persist,
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineEvent {
    PriorStateLoaded,
    FreshConversation,
    TopicResolved,
    CategoryAssigned,
    RequirementsMissing,
    RequirementsSatisfied,
    InfoRequested,
    HandlerMatched,
    NoHandlerRegistered,
    HandlerCompleted,
    ResponseGenerated,
    ConfidenceAccepted,
    ConfidenceRejected,
    EscalationCompleted,
    StatePersisted,
}

/// Facts the guards consult. The engine never computes these itself; the
/// caller records what the stages produced.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct PipelineContext {
    pub missing_requirements: Vec<String>,
    pub confidence: Option<f64>,
    pub confidence_threshold: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransitionOutcome {
    pub from: PipelineState,
    pub to: PipelineState,
    pub event: PipelineEvent,
}
