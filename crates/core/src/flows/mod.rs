pub mod engine;
pub mod states;

pub use engine::{ConversationFlow, FlowDefinition, PipelineEngine, PipelineTransitionError};
pub use states::{PipelineContext, PipelineEvent, PipelineState, TransitionOutcome};
