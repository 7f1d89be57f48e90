use thiserror::Error;

use crate::flows::states::{PipelineContext, PipelineEvent, PipelineState, TransitionOutcome};

pub trait FlowDefinition {
    fn initial_state(&self) -> PipelineState;
    fn transition(
        &self,
        current: &PipelineState,
        event: &PipelineEvent,
        context: &PipelineContext,
    ) -> Result<TransitionOutcome, PipelineTransitionError>;
}

/// The single linear conversation flow: thread check, classification,
/// validation, routing, response, confidence gate, persistence.
#[derive(Clone, Debug, Default)]
pub struct ConversationFlow;

impl FlowDefinition for ConversationFlow {
    fn initial_state(&self) -> PipelineState {
        PipelineState::Start
    }

    fn transition(
        &self,
        current: &PipelineState,
        event: &PipelineEvent,
        context: &PipelineContext,
    ) -> Result<TransitionOutcome, PipelineTransitionError> {
        transition_conversation(current, event, context)
    }
}

pub struct PipelineEngine<F = ConversationFlow> {
    flow: F,
}

impl<F> PipelineEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> PipelineState {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: &PipelineState,
        event: &PipelineEvent,
        context: &PipelineContext,
    ) -> Result<TransitionOutcome, PipelineTransitionError> {
        self.flow.transition(current, event, context)
    }
}

impl Default for PipelineEngine<ConversationFlow> {
    fn default() -> Self {
        Self::new(ConversationFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum PipelineTransitionError {
    #[error("guard rejected event {event:?} in state {state:?}: {reason}")]
    GuardViolation { state: PipelineState, event: PipelineEvent, reason: String },
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: PipelineState, event: PipelineEvent },
}

fn transition_conversation(
    current: &PipelineState,
    event: &PipelineEvent,
    context: &PipelineContext,
) -> Result<TransitionOutcome, PipelineTransitionError> {
    use PipelineEvent::{
        CategoryAssigned, ConfidenceAccepted, ConfidenceRejected, EscalationCompleted,
        FreshConversation, HandlerCompleted, HandlerMatched, InfoRequested, NoHandlerRegistered,
        PriorStateLoaded, RequirementsMissing, RequirementsSatisfied, ResponseGenerated,
        StatePersisted, TopicResolved,
    };
    use PipelineState::{
        AskInfo, Classify, Confidence, DefaultResponse, End, Escalate, Handler, Persist, Route,
        Start, ThreadCheck, Validate,
    };

    let guard_violation = |reason: &str| PipelineTransitionError::GuardViolation {
        state: *current,
        event: *event,
        reason: reason.to_string(),
    };

    let to = match (current, event) {
        (Start, PriorStateLoaded) => ThreadCheck,
        (Start, FreshConversation) => Classify,
        (ThreadCheck, TopicResolved) => Classify,
        (Classify, CategoryAssigned) => Validate,
        (Validate, RequirementsMissing) => {
            if context.missing_requirements.is_empty() {
                return Err(guard_violation("no missing requirements recorded"));
            }
            AskInfo
        }
        (Validate, RequirementsSatisfied) => {
            if !context.missing_requirements.is_empty() {
                return Err(guard_violation("missing requirements still recorded"));
            }
            Route
        }
        (AskInfo, InfoRequested) => Persist,
        (Route, HandlerMatched) => Handler,
        (Route, NoHandlerRegistered) => DefaultResponse,
        (Handler, HandlerCompleted) => Persist,
        (DefaultResponse, ResponseGenerated) => Confidence,
        (Confidence, ConfidenceAccepted) => {
            let confidence =
                context.confidence.ok_or_else(|| guard_violation("no confidence recorded"))?;
            if confidence < context.confidence_threshold {
                return Err(guard_violation("confidence below threshold"));
            }
            Persist
        }
        (Confidence, ConfidenceRejected) => {
            let confidence =
                context.confidence.ok_or_else(|| guard_violation("no confidence recorded"))?;
            if confidence >= context.confidence_threshold {
                return Err(guard_violation("confidence meets threshold"));
            }
            Escalate
        }
        (Escalate, EscalationCompleted) => Persist,
        (Persist, StatePersisted) => End,
        _ => {
            return Err(PipelineTransitionError::InvalidTransition {
                state: *current,
                event: *event,
            });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: *event })
}

#[cfg(test)]
mod tests {
    use crate::flows::engine::{PipelineEngine, PipelineTransitionError};
    use crate::flows::states::{PipelineContext, PipelineEvent, PipelineState};

    fn walk(
        engine: &PipelineEngine,
        events: &[PipelineEvent],
        context: &PipelineContext,
    ) -> Vec<PipelineState> {
        let mut state = engine.initial_state();
        let mut visited = vec![state];
        for event in events {
            state = engine.apply(&state, event, context).expect("valid transition").to;
            visited.push(state);
        }
        visited
    }

    #[test]
    fn ask_info_path_short_circuits_to_persist() {
        let engine = PipelineEngine::default();
        let context = PipelineContext {
            missing_requirements: vec!["account_number".to_string()],
            ..PipelineContext::default()
        };

        let visited = walk(
            &engine,
            &[
                PipelineEvent::FreshConversation,
                PipelineEvent::CategoryAssigned,
                PipelineEvent::RequirementsMissing,
                PipelineEvent::InfoRequested,
                PipelineEvent::StatePersisted,
            ],
            &context,
        );

        assert_eq!(
            visited,
            vec![
                PipelineState::Start,
                PipelineState::Classify,
                PipelineState::Validate,
                PipelineState::AskInfo,
                PipelineState::Persist,
                PipelineState::End,
            ]
        );
    }

    #[test]
    fn handler_path_skips_confidence() {
        let engine = PipelineEngine::default();
        let context = PipelineContext::default();

        let visited = walk(
            &engine,
            &[
                PipelineEvent::PriorStateLoaded,
                PipelineEvent::TopicResolved,
                PipelineEvent::CategoryAssigned,
                PipelineEvent::RequirementsSatisfied,
                PipelineEvent::HandlerMatched,
                PipelineEvent::HandlerCompleted,
                PipelineEvent::StatePersisted,
            ],
            &context,
        );

        assert!(!visited.contains(&PipelineState::Confidence));
        assert_eq!(visited.last(), Some(&PipelineState::End));
    }

    #[test]
    fn low_confidence_routes_through_escalation() {
        let engine = PipelineEngine::default();
        let context = PipelineContext {
            confidence: Some(0.2),
            confidence_threshold: 0.7,
            ..PipelineContext::default()
        };

        let visited = walk(
            &engine,
            &[
                PipelineEvent::FreshConversation,
                PipelineEvent::CategoryAssigned,
                PipelineEvent::RequirementsSatisfied,
                PipelineEvent::NoHandlerRegistered,
                PipelineEvent::ResponseGenerated,
                PipelineEvent::ConfidenceRejected,
                PipelineEvent::EscalationCompleted,
                PipelineEvent::StatePersisted,
            ],
            &context,
        );

        assert!(visited.contains(&PipelineState::Escalate));
        assert_eq!(visited.last(), Some(&PipelineState::End));
    }

    #[test]
    fn requirements_guard_rejects_mismatched_event() {
        let engine = PipelineEngine::default();
        let context = PipelineContext {
            missing_requirements: vec!["account_number".to_string()],
            ..PipelineContext::default()
        };

        let error = engine
            .apply(&PipelineState::Validate, &PipelineEvent::RequirementsSatisfied, &context)
            .expect_err("guard must reject");

        assert!(matches!(error, PipelineTransitionError::GuardViolation { .. }));
    }

    #[test]
    fn confidence_guard_requires_recorded_score() {
        let engine = PipelineEngine::default();
        let error = engine
            .apply(
                &PipelineState::Confidence,
                &PipelineEvent::ConfidenceAccepted,
                &PipelineContext::default(),
            )
            .expect_err("missing confidence must be rejected");

        assert!(matches!(error, PipelineTransitionError::GuardViolation { .. }));
    }

    #[test]
    fn backward_transitions_are_invalid() {
        let engine = PipelineEngine::default();
        let error = engine
            .apply(&PipelineState::Persist, &PipelineEvent::CategoryAssigned, &PipelineContext::default())
            .expect_err("no backward edges");

        assert!(matches!(
            error,
            PipelineTransitionError::InvalidTransition {
                state: PipelineState::Persist,
                event: PipelineEvent::CategoryAssigned
            }
        ));
    }

    #[test]
    fn replay_is_deterministic_for_same_event_sequence() {
        let engine = PipelineEngine::default();
        let context = PipelineContext {
            confidence: Some(0.9),
            confidence_threshold: 0.7,
            ..PipelineContext::default()
        };
        let events = [
            PipelineEvent::FreshConversation,
            PipelineEvent::CategoryAssigned,
            PipelineEvent::RequirementsSatisfied,
            PipelineEvent::NoHandlerRegistered,
            PipelineEvent::ResponseGenerated,
            PipelineEvent::ConfidenceAccepted,
            PipelineEvent::StatePersisted,
        ];

        let first = walk(&engine, &events, &context);
        let second = walk(&engine, &events, &context);
        assert_eq!(first, second);
    }
}
