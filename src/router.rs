use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::agents::{AgentRegistry, DEFAULT_MODEL};
use crate::llm_client::SharedLlmClient;

/// Maps free-text input to the best-matching agent name via one oracle call.
/// Anything the oracle says that is not a registered name resolves to the
/// current agent, so routing can never leave the configured set.
pub struct Router {
    registry: Arc<AgentRegistry>,
    llm_client: SharedLlmClient,
    classifier_model: String,
}

impl Router {
    pub fn new(registry: Arc<AgentRegistry>, llm_client: SharedLlmClient) -> Self {
        Self {
            registry,
            llm_client,
            classifier_model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_classifier_model(mut self, model: impl Into<String>) -> Self {
        self.classifier_model = model.into();
        self
    }

    #[instrument(skip_all, fields(current = %current_agent_name))]
    pub async fn classify(
        &self,
        user_text: &str,
        current_agent_name: &str,
    ) -> anyhow::Result<String> {
        let prompt = self.compose_prompt(user_text, current_agent_name);
        let raw = self
            .llm_client
            .generate(&self.classifier_model, &prompt)
            .await?;

        match Self::parse_candidate(&raw).and_then(|candidate| self.registry.resolve(&candidate)) {
            Some(agent) => {
                debug!(selected = %agent.name, "Classifier selected agent");
                Ok(agent.name.clone())
            }
            None => {
                warn!(raw = %raw.trim(), "Unrecognized classifier output; staying on current agent");
                Ok(current_agent_name.to_string())
            }
        }
    }

    fn compose_prompt(&self, user_text: &str, current_agent_name: &str) -> String {
        let mut roster = self
            .registry
            .agents()
            .map(|agent| format!("- {}: {}", agent.name, agent.description))
            .collect::<Vec<_>>();
        roster.sort();

        format!(
            "You are a strict classifier routing a user message to one expert agent.\n\
             Available agents:\n{roster}\n\n\
             The conversation is currently handled by: {current_agent_name}\n\n\
             User message:\n{user_text}\n\n\
             Respond with exactly one agent name from the list and nothing else.",
            roster = roster.join("\n"),
        )
    }

    /// Oracle output is free text; take the first non-empty line and strip
    /// the decoration models tend to add around a bare identifier. Quoting
    /// and punctuation can nest (`"name".`), so trim until stable.
    fn parse_candidate(raw: &str) -> Option<String> {
        let line = raw.lines().map(str::trim).find(|line| !line.is_empty())?;
        let mut candidate = line;
        loop {
            let stripped = candidate
                .trim_end_matches('.')
                .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '*')
                .trim();
            if stripped == candidate {
                break;
            }
            candidate = stripped;
        }
        (!candidate.is_empty()).then(|| candidate.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::agents::{Agent, AgentRegistry};
    use crate::llm_client::scripted::ScriptedLlmClient;

    fn sample_registry() -> Arc<AgentRegistry> {
        let agents = vec![
            Agent::new("math_expert", "Expert in math", "You are a math expert."),
            Agent::new(
                "python_expert",
                "Expert in python",
                "You are a python expert.",
            ),
        ];
        Arc::new(AgentRegistry::new(agents, "math_expert").expect("valid registry"))
    }

    #[tokio::test]
    async fn classify_returns_matching_agent() {
        let oracle = Arc::new(ScriptedLlmClient::default());
        oracle.push_generate("python_expert");
        let router = Router::new(sample_registry(), oracle.clone());

        let selected = router
            .classify("Help me with python code", "math_expert")
            .await
            .expect("classification succeeds");

        assert_eq!(selected, "python_expert");
        assert_eq!(oracle.generate_calls().len(), 1);
    }

    #[tokio::test]
    async fn classify_prompt_carries_roster_and_current_agent() {
        let oracle = Arc::new(ScriptedLlmClient::default());
        oracle.push_generate("math_expert");
        let router = Router::new(sample_registry(), oracle.clone());

        router
            .classify("What is 2+2?", "math_expert")
            .await
            .expect("classification succeeds");

        let calls = oracle.generate_calls();
        let (_, prompt) = &calls[0];
        assert!(prompt.contains("math_expert: Expert in math"));
        assert!(prompt.contains("python_expert: Expert in python"));
        assert!(prompt.contains("currently handled by: math_expert"));
        assert!(prompt.contains("What is 2+2?"));
    }

    #[tokio::test]
    async fn classifier_model_override_reaches_the_oracle() {
        let oracle = Arc::new(ScriptedLlmClient::default());
        oracle.push_generate("math_expert");
        let router =
            Router::new(sample_registry(), oracle.clone()).with_classifier_model("gpt-4o-mini");

        router
            .classify("What is 2+2?", "math_expert")
            .await
            .expect("classification succeeds");

        let calls = oracle.generate_calls();
        assert_eq!(calls[0].0, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn unknown_output_falls_back_to_current_agent() {
        let oracle = Arc::new(ScriptedLlmClient::default());
        oracle.push_generate("chemistry_expert");
        let router = Router::new(sample_registry(), oracle);

        let selected = router
            .classify("Balance this equation", "math_expert")
            .await
            .expect("classification succeeds");

        assert_eq!(selected, "math_expert");
    }

    #[tokio::test]
    async fn messy_output_is_parsed_defensively() {
        for raw in [
            "  python_expert  ",
            "\n\n`python_expert`\nbecause the user asked for code",
            "\"python_expert\".",
            "`python_expert`.",
            "'python_expert'.",
            "**python_expert**",
            "Python_Expert",
        ] {
            let oracle = Arc::new(ScriptedLlmClient::default());
            oracle.push_generate(raw);
            let router = Router::new(sample_registry(), oracle);

            let selected = router
                .classify("Write a script", "math_expert")
                .await
                .expect("classification succeeds");

            assert_eq!(selected, "python_expert", "raw output: {raw:?}");
        }
    }

    #[tokio::test]
    async fn empty_output_falls_back_to_current_agent() {
        let oracle = Arc::new(ScriptedLlmClient::default());
        oracle.push_generate("   \n  ");
        let router = Router::new(sample_registry(), oracle);

        let selected = router
            .classify("hello", "math_expert")
            .await
            .expect("classification succeeds");

        assert_eq!(selected, "math_expert");
    }

    #[tokio::test]
    async fn oracle_failure_propagates() {
        let oracle = Arc::new(ScriptedLlmClient::default());
        oracle.push_generate_err("backend unreachable");
        let router = Router::new(sample_registry(), oracle);

        let result = router.classify("hello", "math_expert").await;
        assert!(result.is_err());
    }
}
