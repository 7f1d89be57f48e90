/// The four prompt templates the pipeline stages send to the completion
/// collaborator. Passed to the processor at construction; customizing a
/// prompt means constructing with a different set, never mutating shared
/// state.
#[derive(Clone, Debug)]
pub struct PromptTemplates {
    pub thread_check: String,
    pub classification: String,
    pub requirements: String,
    pub response_guidance: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            thread_check: "\
Determine if the current message starts a NEW conversation topic or continues the EXISTING topic.

Recent conversation context: {recent_context}
Current message: {message}

Rules:
- If the current message introduces a completely different problem or service area, respond \"NEW\"
- If the current message continues the same issue, provides requested information, or adds details, respond \"CONTINUE\"
- Be conservative: when in doubt, choose \"CONTINUE\"

Respond with only \"NEW\" or \"CONTINUE\":"
                .to_string(),
            classification: "\
Classify the following user message into ONE of these categories: {categories}

Instructions:
- Choose the most appropriate category based on the user's intent
- If the message doesn't clearly fit any category, respond with \"default\"
- Respond with ONLY the category name, nothing else

User message: \"{message}\"

Category:"
                .to_string(),
            requirements: "\
Analyze the conversation to determine which required information is present or missing.

Required fields: {required_fields}{recent_context}
Current message: \"{message}\"

Instructions:
- Look at the entire conversation history, not just the current message
- For each required field, determine if any message in the conversation contains that information
- List only the missing field names, separated by commas
- If all fields are present, respond with \"NONE\"

Missing fields:"
                .to_string(),
            response_guidance: "\
Important: if the user asks about request status, ticket status, or an earlier request, refer to \
anything mentioned in the conversation history above and reference specific ticket ids when given."
                .to_string(),
        }
    }
}

/// Single-pass `{placeholder}` substitution. Unknown placeholders are left
/// in place so a template typo is visible in the outgoing prompt.
pub fn render(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut rendered = template.to_string();
    for (name, value) in substitutions {
        rendered = rendered.replace(&format!("{{{name}}}"), value);
    }
    rendered
}
