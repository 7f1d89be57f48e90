use tracing::warn;

use concierge_core::AgentState;

use crate::llm::LlmClient;
use crate::prompts::{render, PromptTemplates};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadVerdict {
    New,
    Continue,
}

/// Decides whether the incoming message opens a new topic or continues the
/// current one, judged against a short window of recent user messages. No
/// prior user messages means an implicit `New`. A collaborator failure is
/// absorbed as `Continue`, the conservative verdict.
pub async fn detect_thread(
    llm: &dyn LlmClient,
    templates: &PromptTemplates,
    state: &AgentState,
    message: &str,
    window: usize,
) -> ThreadVerdict {
    let recent = state.recent_user_contents(window);
    if recent.is_empty() {
        return ThreadVerdict::New;
    }

    let prompt = render(
        &templates.thread_check,
        &[("recent_context", recent.join(" | ").as_str()), ("message", message)],
    );

    match llm.complete(&prompt).await {
        Ok(reply) => {
            if reply.trim().eq_ignore_ascii_case("NEW") {
                ThreadVerdict::New
            } else {
                ThreadVerdict::Continue
            }
        }
        Err(error) => {
            warn!(%error, "thread check failed, assuming continuation");
            ThreadVerdict::Continue
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

    use super::{detect_thread, ThreadVerdict};

    struct FixedLlm {
        reply: Result<String, CollaboratorError>,
        prompts: Mutex<Vec<String>>,
    }

    impl FixedLlm {
        fn replying(reply: &str) -> Self {
            Self { reply: Ok(reply.to_string()), prompts: Mutex::new(Vec::new()) }
        }

        fn failing() -> Self {
            Self {
                reply: Err(CollaboratorError::Timeout { seconds: 30 }),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for FixedLlm {
        async fn complete(&self, prompt: &str) -> Result<String, CollaboratorError> {
            self.prompts.lock().await.push(prompt.to_string());
            self.reply.clone()
        }
    }

    fn state_with_history() -> AgentState {
        let mut state = AgentState::default();
        state.messages.push(Message::user("I need a refund"));
        state.messages.push(Message::assistant("What's your account number?"));
        state
    }

    #[tokio::test]
    async fn no_prior_user_messages_is_an_implicit_new_thread() {
        let llm = FixedLlm::replying("CONTINUE");
        let verdict = detect_thread(
            &llm,
            &PromptTemplates::default(),
            &AgentState::default(),
            "hello",
            3,
        )
        .await;

        assert_eq!(verdict, ThreadVerdict::New);
        assert!(llm.prompts.lock().await.is_empty(), "no collaborator call expected");
    }

    #[tokio::test]
    async fn continuation_preserves_the_running_topic() {
        let llm = FixedLlm::replying("CONTINUE");
        let verdict = detect_thread(
            &llm,
            &PromptTemplates::default(),
            &state_with_history(),
            "for order 12345",
            3,
        )
        .await;

        assert_eq!(verdict, ThreadVerdict::Continue);
        let prompts = llm.prompts.lock().await;
        assert!(prompts[0].contains("I need a refund"));
        assert!(prompts[0].contains("for order 12345"));
    }

    #[tokio::test]
    async fn verdict_parsing_is_case_insensitive() {
        let llm = FixedLlm::replying("  new  ");
        let verdict = detect_thread(
            &llm,
            &PromptTemplates::default(),
            &state_with_history(),
            "What time do you open?",
            3,
        )
        .await;

        assert_eq!(verdict, ThreadVerdict::New);
    }

    #[tokio::test]
    async fn collaborator_failure_degrades_to_continue() {
        let llm = FixedLlm::failing();
        let verdict = detect_thread(
            &llm,
            &PromptTemplates::default(),
            &state_with_history(),
            "still broken",
            3,
        )
        .await;

        assert_eq!(verdict, ThreadVerdict::Continue);
    }
}
