use std::collections::HashMap;

use anyhow::bail;

use super::agent::Agent;

/// Immutable agent roster with a designated default. Names are unique;
/// duplicates are a configuration error caught at construction.
pub struct AgentRegistry {
    agents: HashMap<String, Agent>,
    default_agent: String,
}

impl AgentRegistry {
    pub fn new(agents: Vec<Agent>, default_agent: &str) -> anyhow::Result<Self> {
        if agents.is_empty() {
            bail!("Agent registry requires at least one agent");
        }

        let mut by_name = HashMap::with_capacity(agents.len());
        for agent in agents {
            if by_name.contains_key(&agent.name) {
                bail!("Duplicate agent name '{}' in registry", agent.name);
            }
            by_name.insert(agent.name.clone(), agent);
        }

        if !by_name.contains_key(default_agent) {
            bail!("Default agent '{default_agent}' is not in the registry");
        }

        Ok(Self {
            agents: by_name,
            default_agent: default_agent.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&Agent> {
        self.agents.get(name)
    }

    /// Case-insensitive lookup returning the canonical registered name.
    pub fn resolve(&self, candidate: &str) -> Option<&Agent> {
        self.agents.get(candidate).or_else(|| {
            self.agents
                .values()
                .find(|agent| agent.name.eq_ignore_ascii_case(candidate))
        })
    }

    pub fn default_agent(&self) -> &Agent {
        // Membership is checked in new(), so the entry always exists.
        &self.agents[&self.default_agent]
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
