use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::agents::AgentRegistry;
use crate::llm_client::SharedLlmClient;
use crate::router::Router;

use super::store::{Message, Session, SessionConfig, SessionStore};

/// Outcome of one processed turn. Not persisted; the transcript lives in
/// the session history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResult {
    pub content: String,
    pub agent_name: String,
    pub switched_context: bool,
}

/// Owns per-user sessions and drives one turn at a time: classify, switch
/// agent on disagreement, generate under the active persona, append to
/// history. Oracle failures propagate untouched; a failed turn leaves the
/// history exactly as it was.
pub struct ConversationManager {
    registry: Arc<AgentRegistry>,
    router: Router,
    llm_client: SharedLlmClient,
    store: SessionStore,
}

impl ConversationManager {
    pub fn new(
        registry: Arc<AgentRegistry>,
        router: Router,
        llm_client: SharedLlmClient,
    ) -> Self {
        Self::with_session_config(registry, router, llm_client, SessionConfig::default())
    }

    pub fn with_session_config(
        registry: Arc<AgentRegistry>,
        router: Router,
        llm_client: SharedLlmClient,
        config: SessionConfig,
    ) -> Self {
        Self {
            registry,
            router,
            llm_client,
            store: SessionStore::new(config),
        }
    }

    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn process_turn(&self, user_id: &str, user_text: &str) -> anyhow::Result<TurnResult> {
        let session = self
            .store
            .get_or_create(user_id, self.registry.default_agent())?;
        // Holding the session lock across the oracle calls serializes turns
        // for this user_id.
        let mut session = session.lock().await;

        let selected = self
            .router
            .classify(user_text, &session.current_agent.name)
            .await?;

        let switched_context = selected != session.current_agent.name;
        if switched_context {
            let agent = self.registry.get(&selected).with_context(|| {
                format!("Classifier selected unregistered agent '{selected}'")
            })?;
            info!(from = %session.current_agent.name, to = %agent.name, "Switching agent");
            session.current_agent = agent.clone();
        }

        let agent = session.current_agent.clone();
        let content = self
            .llm_client
            .chat(
                &agent.model_name,
                &agent.system_prompt,
                &session.history,
                user_text,
            )
            .await?;

        session.history.push(Message::user(user_text));
        session.history.push(Message::assistant(content.clone()));

        Ok(TurnResult {
            content,
            agent_name: agent.name,
            switched_context,
        })
    }

    /// Point-in-time copy of a session, if one exists for `user_id`.
    pub async fn session_snapshot(&self, user_id: &str) -> anyhow::Result<Option<Session>> {
        match self.store.get(user_id)? {
            Some(session) => Ok(Some(session.lock().await.clone())),
            None => Ok(None),
        }
    }
}
