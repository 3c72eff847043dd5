use serde::{Deserialize, Serialize};

/// Model used when an agent does not name one explicitly.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Named persona with a system prompt and target model. Immutable after
/// construction; the description doubles as the classification hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    pub model_name: String,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            system_prompt: system_prompt.into(),
            model_name: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_defaults_to_fixed_model() {
        let agent = Agent::new("test", "desc", "prompt");
        assert_eq!(agent.name, "test");
        assert_eq!(agent.description, "desc");
        assert_eq!(agent.system_prompt, "prompt");
        assert_eq!(agent.model_name, DEFAULT_MODEL);
    }

    #[test]
    fn with_model_overrides_default() {
        let agent = Agent::new("test", "desc", "prompt").with_model("gpt-4o-mini");
        assert_eq!(agent.model_name, "gpt-4o-mini");
    }
}
