use super::agent::Agent;

pub const DEFAULT_AGENT_NAME: &str = "general_assistant";

/// Built-in roster used by the CLI when no custom agents are wired in.
pub fn default_roster() -> Vec<Agent> {
    vec![
        Agent::new(
            DEFAULT_AGENT_NAME,
            "General-purpose assistant for everyday questions",
            "You are a helpful, concise assistant. Answer directly and flag uncertainty.",
        ),
        Agent::new(
            "math_expert",
            "Expert in math, arithmetic, algebra, and proofs",
            "You are a math expert. Show your working step by step and state the final answer clearly.",
        ),
        Agent::new(
            "python_expert",
            "Expert in python code, scripts, and debugging",
            "You are a python expert. Prefer idiomatic, runnable code with a short explanation.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentRegistry;

    #[test]
    fn default_roster_builds_a_registry() {
        let registry =
            AgentRegistry::new(default_roster(), DEFAULT_AGENT_NAME).expect("valid roster");
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.default_agent().name, DEFAULT_AGENT_NAME);
    }
}
