use concierge_core::CategoryRequirement;

/// What makes one agent different from another: its voice, its category
/// list, and what each category needs collected before routing. Plain
/// values supplied by the surrounding application.
#[derive(Clone, Debug)]
pub struct AgentProfile {
    pub name: String,
    pub personality: String,
    pub categories: Vec<String>,
    pub requirements: Vec<CategoryRequirement>,
    pub confidence_threshold: f64,
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            name: "agent".to_string(),
            personality: "You are a helpful assistant.".to_string(),
            categories: Vec::new(),
            requirements: Vec::new(),
            confidence_threshold: 0.7,
        }
    }
}

impl AgentProfile {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }
}
