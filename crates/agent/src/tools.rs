use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool execution failed: {0}")]
    Execution(String),
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, input: Value) -> Result<Value, ToolError>;
}

/// Tools available to an agent. The default-response prompt lists their
/// names so the model knows what the surrounding application can do.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(Box::as_ref)
    }

    /// Registered tool names in stable alphabetical order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::{Tool, ToolError, ToolRegistry};

    struct TicketLookup;

    #[async_trait]
    impl Tool for TicketLookup {
        fn name(&self) -> &'static str {
            "ticket_lookup"
        }

        async fn execute(&self, input: Value) -> Result<Value, ToolError> {
            let ticket_id = input
                .get("ticket_id")
                .and_then(Value::as_str)
                .ok_or_else(|| ToolError::Execution("ticket_id is required".to_string()))?;
            Ok(json!({ "ticket_id": ticket_id, "status": "open" }))
        }
    }

    struct CreateTicket;

    #[async_trait]
    impl Tool for CreateTicket {
        fn name(&self) -> &'static str {
            "create_ticket"
        }

        async fn execute(&self, _input: Value) -> Result<Value, ToolError> {
            Ok(json!({ "ticket_id": "T-1001" }))
        }
    }

    #[tokio::test]
    async fn names_are_sorted_for_prompt_stability() {
        let mut registry = ToolRegistry::new();
        registry.register(TicketLookup);
        registry.register(CreateTicket);

        assert_eq!(registry.names(), vec!["create_ticket", "ticket_lookup"]);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn registered_tool_executes() {
        let mut registry = ToolRegistry::new();
        registry.register(TicketLookup);

        let tool = registry.get("ticket_lookup").expect("tool exists");
        let output = tool.execute(json!({ "ticket_id": "T-42" })).await.expect("execute");
        assert_eq!(output["status"], "open");

        let error = tool.execute(json!({})).await.expect_err("missing input");
        assert!(matches!(error, ToolError::Execution(_)));
    }
}
