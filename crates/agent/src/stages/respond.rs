use tracing::warn;

use concierge_core::{AgentState, Role};

use crate::llm::LlmClient;
use crate::prompts::PromptTemplates;

/// Returned whenever the completion collaborator fails; the user never goes
/// unanswered.
pub const FALLBACK_RESPONSE: &str =
    "I apologize, but I encountered an error while processing your request. Please try again.";

/// Composes the default-response prompt: personality, retrieved knowledge,
/// available tool names, the full conversation history, and the current
/// message, then asks the collaborator to answer as the assistant.
pub async fn default_response(
    llm: &dyn LlmClient,
    templates: &PromptTemplates,
    personality: &str,
    knowledge_block: &str,
    tool_names: &[String],
    state: &AgentState,
    message: &str,
) -> String {
    let mut prompt = personality.to_string();

    if !knowledge_block.is_empty() {
        prompt.push_str("\n\nKnowledge:\n");
        prompt.push_str(knowledge_block);
    }

    if !tool_names.is_empty() {
        prompt.push_str("\n\nTools: ");
        prompt.push_str(&tool_names.join(", "));
    }

    prompt.push_str("\n\nConversation history (use this context to provide relevant responses):");
    for turn in &state.messages {
        let speaker = match turn.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        prompt.push_str(&format!("\n{speaker}: {}", turn.content));
    }
    prompt.push_str(&format!("\nUser: {message}"));

    prompt.push_str("\n\n");
    prompt.push_str(&templates.response_guidance);
    prompt.push_str("\nAssistant:");

    match llm.complete(&prompt).await {
        Ok(reply) => reply.trim().to_string(),
        Err(error) => {
            warn!(%error, "default response generation failed, using fallback");
            FALLBACK_RESPONSE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use concierge_core::{AgentState, CollaboratorError, Message};

    use crate::llm::LlmClient;
    use crate::prompts::PromptTemplates;

    use super::{default_response, FALLBACK_RESPONSE};

    struct FixedLlm {
        reply: Result<String, CollaboratorError>,
        prompts: Mutex<Vec<String>>,
    }

    impl FixedLlm {
        fn replying(reply: &str) -> Self {
            Self { reply: Ok(reply.to_string()), prompts: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl LlmClient for FixedLlm {
        async fn complete(&self, prompt: &str) -> Result<String, CollaboratorError> {
            self.prompts.lock().await.push(prompt.to_string());
            self.reply.clone()
        }
    }

    #[tokio::test]
    async fn prompt_carries_personality_knowledge_tools_and_history() {
        let llm = FixedLlm::replying("Here is what I found.");
        let mut state = AgentState::default();
        state.messages.push(Message::user("earlier question"));
        state.messages.push(Message::assistant("earlier answer"));

        let reply = default_response(
            &llm,
            &PromptTemplates::default(),
            "You are a support agent for Acme.",
            "Knowledge source 1 (policies.md, chunk 1/1):\nRefunds take five days.",
            &["create_ticket".to_string(), "ticket_lookup".to_string()],
            &state,
            "how long do refunds take?",
        )
        .await;

        assert_eq!(reply, "Here is what I found.");
        let prompts = llm.prompts.lock().await;
        let prompt = &prompts[0];
        assert!(prompt.starts_with("You are a support agent for Acme."));
        assert!(prompt.contains("Refunds take five days."));
        assert!(prompt.contains("Tools: create_ticket, ticket_lookup"));
        assert!(prompt.contains("User: earlier question"));
        assert!(prompt.contains("Assistant: earlier answer"));
        assert!(prompt.contains("User: how long do refunds take?"));
        assert!(prompt.trim_end().ends_with("Assistant:"));
    }

    #[tokio::test]
    async fn empty_knowledge_and_tools_are_omitted() {
        let llm = FixedLlm::replying("ok");
        default_response(
            &llm,
            &PromptTemplates::default(),
            "You are a helpful assistant.",
            "",
            &[],
            &AgentState::default(),
            "hello",
        )
        .await;

        let prompts = llm.prompts.lock().await;
        assert!(!prompts[0].contains("Knowledge:"));
        assert!(!prompts[0].contains("Tools:"));
    }

    #[tokio::test]
    async fn collaborator_failure_yields_the_fixed_fallback() {
        let llm = FixedLlm {
            reply: Err(CollaboratorError::Transport("connection reset".to_string())),
            prompts: Mutex::new(Vec::new()),
        };
        let reply = default_response(
            &llm,
            &PromptTemplates::default(),
            "You are a helpful assistant.",
            "",
            &[],
            &AgentState::default(),
            "hello",
        )
        .await;

        assert_eq!(reply, FALLBACK_RESPONSE);
    }
}
