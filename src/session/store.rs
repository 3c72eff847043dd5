use std::collections::HashMap;
use std::env;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agents::Agent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in a session transcript. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-user conversational state: the active agent and the ordered,
/// append-only transcript.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub current_agent: Agent,
    pub history: Vec<Message>,
}

impl Session {
    fn new(user_id: &str, agent: Agent) -> Self {
        Self {
            user_id: user_id.to_string(),
            current_agent: agent,
            history: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sessions idle longer than this are dropped on the next store access.
    pub idle_ttl: Duration,
    /// Hard cap on live sessions; the longest-idle one is evicted first.
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::minutes(30),
            max_sessions: 1024,
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let idle_ttl = env::var("EXPERTFLOW_SESSION_TTL_SECS")
            .ok()
            .and_then(|value| value.parse::<i64>().ok())
            .map(Duration::seconds)
            .unwrap_or(defaults.idle_ttl);
        let max_sessions = env::var("EXPERTFLOW_MAX_SESSIONS")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            // A zero cap would make every new session exceed capacity.
            .map(|value| value.max(1))
            .unwrap_or(defaults.max_sessions);

        Self {
            idle_ttl,
            max_sessions,
        }
    }
}

pub type SharedSession = Arc<tokio::sync::Mutex<Session>>;

struct SessionSlot {
    session: SharedSession,
    last_active: DateTime<Utc>,
}

/// Keyed session map with per-user_id mutual exclusion: each session sits
/// behind its own async mutex, so concurrent turns for one user serialize
/// while other users proceed independently.
pub struct SessionStore {
    config: SessionConfig,
    slots: Mutex<HashMap<String, SessionSlot>>,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the session for `user_id`, lazily creating it with
    /// `default_agent` active. Touches the idle clock and applies the
    /// TTL/cap eviction policy.
    pub fn get_or_create(
        &self,
        user_id: &str,
        default_agent: &Agent,
    ) -> anyhow::Result<SharedSession> {
        let now = Utc::now();
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| anyhow!("session store lock poisoned"))?;

        let before = slots.len();
        slots.retain(|_, slot| now.signed_duration_since(slot.last_active) < self.config.idle_ttl);
        if slots.len() < before {
            debug!(evicted = before - slots.len(), "Expired idle sessions");
        }

        if let Some(slot) = slots.get_mut(user_id) {
            slot.last_active = now;
            return Ok(slot.session.clone());
        }

        if slots.len() >= self.config.max_sessions {
            let oldest = slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_active)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                debug!(user_id = %key, "Evicting longest-idle session at capacity");
                slots.remove(&key);
            }
        }

        let session = Arc::new(tokio::sync::Mutex::new(Session::new(
            user_id,
            default_agent.clone(),
        )));
        slots.insert(
            user_id.to_string(),
            SessionSlot {
                session: session.clone(),
                last_active: now,
            },
        );

        Ok(session)
    }

    pub fn get(&self, user_id: &str) -> anyhow::Result<Option<SharedSession>> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| anyhow!("session store lock poisoned"))?;
        Ok(slots.get(user_id).map(|slot| slot.session.clone()))
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
