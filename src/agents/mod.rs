pub mod agent;
pub mod registry;
pub mod roster;

pub use agent::{Agent, DEFAULT_MODEL};
pub use registry::AgentRegistry;
pub use roster::{default_roster, DEFAULT_AGENT_NAME};
