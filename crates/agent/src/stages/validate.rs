use std::collections::BTreeSet;

use tracing::warn;

use concierge_core::{AgentState, CategoryRequirement, Role};

use crate::llm::LlmClient;
use crate::prompts::{render, PromptTemplates};

/// Asks the collaborator which required fields are still missing from the
/// conversation. No configured requirement means nothing can be missing.
/// Field names outside the requirement are discarded; a collaborator
/// failure degrades to "nothing missing" so the pipeline proceeds.
pub async fn missing_requirements(
    llm: &dyn LlmClient,
    templates: &PromptTemplates,
    state: &AgentState,
    message: &str,
    requirement: Option<&CategoryRequirement>,
    context_window: usize,
) -> BTreeSet<String> {
    let Some(requirement) = requirement else {
        return BTreeSet::new();
    };
    if requirement.required_fields.is_empty() {
        return BTreeSet::new();
    }

    let fields: Vec<&str> = requirement.required_fields.iter().map(String::as_str).collect();
    let prompt = render(
        &templates.requirements,
        &[
            ("required_fields", fields.join(", ").as_str()),
            ("recent_context", conversation_context(state, context_window).as_str()),
            ("message", message),
        ],
    );

    match llm.complete(&prompt).await {
        Ok(reply) => parse_missing_fields(&reply, &requirement.required_fields),
        Err(error) => {
            warn!(%error, "requirements check failed, assuming fields are present");
            BTreeSet::new()
        }
    }
}

/// Deterministic prompt asking the user for what is still missing; the
/// invocation short-circuits to persistence after this.
pub fn ask_for_missing(missing: &BTreeSet<String>) -> String {
    let fields: Vec<&str> = missing.iter().map(String::as_str).collect();
    match fields.as_slice() {
        [] => "Could you share a bit more detail so I can help?".to_string(),
        [field] => format!("I can help with that! What's your {field}?"),
        [rest @ .., last] => {
            format!("I can help! I just need your {}, and {last}.", rest.join(", "))
        }
    }
}

fn conversation_context(state: &AgentState, window: usize) -> String {
    let recent = state.recent_messages(window);
    if recent.is_empty() {
        return String::new();
    }

    let lines: Vec<String> = recent
        .iter()
        .map(|message| match message.role {
            Role::User => format!("User: {}", message.content),
            Role::Assistant => format!("Assistant: {}", message.content),
        })
        .collect();
    format!("\nConversation history:\n{}\n", lines.join("\n"))
}

fn parse_missing_fields(reply: &str, required_fields: &BTreeSet<String>) -> BTreeSet<String> {
    let reply = reply.trim();
    if reply.eq_ignore_ascii_case("NONE") {
        return BTreeSet::new();
    }

    reply
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .filter_map(|field| required_fields.get(field).cloned())
        .collect()
}
