use tracing::{debug, warn};

use concierge_core::DEFAULT_CATEGORY;

use crate::llm::LlmClient;
use crate::prompts::{render, PromptTemplates};

/// Assigns a category to the message. With no categories configured the
/// sentinel is returned without a collaborator call. A name outside the
/// configured list, or a collaborator failure, also resolves to the
/// sentinel; classification is never fatal.
pub async fn classify(
    llm: &dyn LlmClient,
    templates: &PromptTemplates,
    message: &str,
    categories: &[String],
) -> String {
    if categories.is_empty() {
        return DEFAULT_CATEGORY.to_string();
    }

    let prompt = render(
        &templates.classification,
        &[("categories", categories.join(", ").as_str()), ("message", message)],
    );

    match llm.complete(&prompt).await {
        Ok(reply) => {
            let name = reply.trim();
            match categories.iter().find(|category| category.eq_ignore_ascii_case(name)) {
                Some(category) => category.clone(),
                None => {
                    debug!(returned = %name, "classifier returned an unknown category");
                    DEFAULT_CATEGORY.to_string()
                }
            }
        }
        Err(error) => {
            warn!(%error, "classification failed, using the default category");
            DEFAULT_CATEGORY.to_string()
        }
    }
}
