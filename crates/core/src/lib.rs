pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod logging;

pub use config::{
    AppConfig, ConfigError, ConfigOverrides, EmbeddingConfig, KnowledgeConfig, LlmConfig,
    LoadOptions, LogFormat, LoggingConfig, PipelineConfig,
};
pub use domain::message::{Message, Role};
pub use domain::requirement::CategoryRequirement;
pub use domain::state::{AgentState, DEFAULT_CATEGORY};
pub use errors::CollaboratorError;
pub use flows::{
    ConversationFlow, FlowDefinition, PipelineContext, PipelineEngine, PipelineEvent,
    PipelineState, PipelineTransitionError, TransitionOutcome,
};
pub use logging::init_logging;
