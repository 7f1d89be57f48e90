use concierge_core::AgentState;

use crate::handlers::HandlerResponse;

/// Scores a default response in [0, 1]. Deliberately pluggable: the
/// built-in heuristic is a cheap proxy, not a calibrated probability, and
/// swapping it must not touch the state machine.
pub trait ConfidenceModel: Send + Sync {
    fn score(&self, response: &str) -> f64;
}

/// Response length normalized against a fixed ceiling, clamped to [0, 1].
/// Longer answers read as more substantiated; one-liners get escalated.
pub struct LengthHeuristic {
    ceiling: usize,
}

impl LengthHeuristic {
    pub fn new(ceiling: usize) -> Self {
        Self { ceiling: ceiling.max(1) }
    }
}

impl Default for LengthHeuristic {
    fn default() -> Self {
        Self::new(100)
    }
}

impl ConfidenceModel for LengthHeuristic {
    fn score(&self, response: &str) -> f64 {
        (response.chars().count() as f64 / self.ceiling as f64).clamp(0.0, 1.0)
    }
}

/// Produces the response used instead of a low-confidence default answer.
pub trait Escalation: Send + Sync {
    fn escalate(&self, state: &AgentState) -> HandlerResponse;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TeamReviewEscalation;

impl Escalation for TeamReviewEscalation {
    fn escalate(&self, _state: &AgentState) -> HandlerResponse {
        HandlerResponse::from_text(
            "Your request is being reviewed by our team and we'll get back to you shortly.",
        )
    }
}

#[cfg(test)]
mod tests {
    use concierge_core::AgentState;

    use super::{ConfidenceModel, Escalation, LengthHeuristic, TeamReviewEscalation};

    #[test]
    fn score_grows_with_length_and_clamps_at_one() {
        let model = LengthHeuristic::new(100);

        assert_eq!(model.score(""), 0.0);
        assert!((model.score(&"x".repeat(50)) - 0.5).abs() < 1e-9);
        assert_eq!(model.score(&"x".repeat(100)), 1.0);
        assert_eq!(model.score(&"x".repeat(500)), 1.0);
    }

    #[test]
    fn zero_ceiling_is_clamped_to_one() {
        let model = LengthHeuristic::new(0);
        assert_eq!(model.score("a"), 1.0);
    }

    #[test]
    fn team_review_escalation_returns_a_review_notice() {
        let response = TeamReviewEscalation.escalate(&AgentState::default());
        assert_eq!(response.messages.len(), 1);
        assert!(response.messages[0].content.contains("reviewed by our team"));
    }
}
