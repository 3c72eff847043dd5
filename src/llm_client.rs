use std::env;
use std::sync::Arc;

use anyhow::Context;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::{config::OpenAIConfig, Client as AsyncOpenAiClient};
use async_trait::async_trait;
use tracing::instrument;

use crate::session::{Message, Role};

pub type SharedLlmClient = Arc<dyn LlmClient>;

/// Boundary to the external generation oracle. Two call shapes: a one-shot
/// completion (used for classification) and a persona-bound chat reply.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> anyhow::Result<String>;

    async fn chat(
        &self,
        model: &str,
        system_prompt: &str,
        history: &[Message],
        user_text: &str,
    ) -> anyhow::Result<String>;
}

/// Offline stand-in so the REPL stays usable without an API key.
#[derive(Debug, Default, Clone)]
pub struct EchoLlmClient;

#[async_trait]
impl LlmClient for EchoLlmClient {
    async fn generate(&self, _model: &str, prompt: &str) -> anyhow::Result<String> {
        Ok(format!("[echo] {prompt}"))
    }

    async fn chat(
        &self,
        _model: &str,
        _system_prompt: &str,
        _history: &[Message],
        user_text: &str,
    ) -> anyhow::Result<String> {
        Ok(format!(
            "[echo reply]\nI received: {user_text}\nNext step: configure an LLM backend."
        ))
    }
}

impl EchoLlmClient {
    pub fn shared() -> SharedLlmClient {
        Arc::new(Self)
    }
}

/// OpenAI-compatible client that can point at OpenAI, vLLM, or any HTTP-compatible backend.
pub struct OpenAiLlmClient {
    client: AsyncOpenAiClient<OpenAIConfig>,
    temperature: f32,
}

impl OpenAiLlmClient {
    const DEFAULT_TEMPERATURE: f32 = 0.2;

    pub fn shared_from_env() -> anyhow::Result<SharedLlmClient> {
        let client = Self::from_env()?;
        Ok(Arc::new(client))
    }

    fn from_env() -> anyhow::Result<Self> {
        let config = Self::build_config_from_env()?;
        let temperature = env::var("EXPERTFLOW_TEMPERATURE")
            .ok()
            .and_then(|value| value.parse::<f32>().ok())
            .unwrap_or(Self::DEFAULT_TEMPERATURE);

        Ok(Self {
            client: AsyncOpenAiClient::with_config(config),
            temperature,
        })
    }

    fn build_config_from_env() -> anyhow::Result<OpenAIConfig> {
        let api_key = env::var("EXPERTFLOW_API_KEY")
            .or_else(|_| env::var("OPENAI_API_KEY"))
            .context("Set EXPERTFLOW_API_KEY (or OPENAI_API_KEY) to use the OpenAI client")?;

        let mut config = OpenAIConfig::new().with_api_key(api_key);

        if let Ok(base_url) =
            env::var("EXPERTFLOW_BASE_URL").or_else(|_| env::var("OPENAI_BASE_URL"))
        {
            config = config.with_api_base(base_url);
        }

        Ok(config)
    }

    fn first_choice(
        response: async_openai::types::CreateChatCompletionResponse,
    ) -> anyhow::Result<String> {
        let choice = response
            .choices
            .first()
            .context("LLM response did not contain any choices")?;

        Ok(choice
            .message
            .content
            .clone()
            .unwrap_or_else(|| String::from("[empty LLM response]")))
    }
}

#[async_trait]
impl LlmClient for OpenAiLlmClient {
    #[instrument(level = "debug", skip_all, fields(model = %model))]
    async fn generate(&self, model: &str, prompt: &str) -> anyhow::Result<String> {
        let user_message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .temperature(self.temperature)
            .messages(vec![user_message.into()])
            .build()?;

        let response = self.client.chat().create(request).await?;
        Self::first_choice(response)
    }

    #[instrument(level = "debug", skip_all, fields(model = %model, history_len = history.len()))]
    async fn chat(
        &self,
        model: &str,
        system_prompt: &str,
        history: &[Message],
        user_text: &str,
    ) -> anyhow::Result<String> {
        let mut messages: Vec<ChatCompletionRequestMessage> =
            Vec::with_capacity(history.len() + 2);
        messages.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()?
                .into(),
        );

        for message in history {
            match message.role {
                Role::User => messages.push(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(message.content.as_str())
                        .build()?
                        .into(),
                ),
                Role::Assistant => messages.push(
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(message.content.as_str())
                        .build()?
                        .into(),
                ),
            }
        }

        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_text)
                .build()?
                .into(),
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .temperature(self.temperature)
            .messages(messages)
            .build()?;

        let response = self.client.chat().create(request).await?;
        Self::first_choice(response)
    }
}

/// Attempt to build an OpenAI-compatible client, optionally falling back to the echo client.
pub fn build_llm_client_from_env(default_to_echo: bool) -> anyhow::Result<SharedLlmClient> {
    match OpenAiLlmClient::shared_from_env() {
        Ok(client) => Ok(client),
        Err(err) if default_to_echo => {
            tracing::warn!(?err, "Falling back to EchoLlmClient");
            Ok(EchoLlmClient::shared())
        }
        Err(err) => Err(err),
    }
}
