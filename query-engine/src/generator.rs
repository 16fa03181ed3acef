use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use common::{error::AppError, utils::config::AppConfig};
use tracing::debug;

/// A prompt rendered for the completion model: corpus-specific system
/// wording plus the user message carrying context and question.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

/// External text-completion capability: given a prompt, return a completion
/// or fail. Everything the engine knows about the language model goes
/// through this boundary, which keeps retrieval testable without it.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, AppError>;
}

/// Chat-completion generator for an OpenAI-compatible endpoint.
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiGenerator {
    /// Returns `None` when no API key is configured; the engine then
    /// answers queries with an explanatory string instead of failing.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        let api_key = config.openai_api_key.as_deref()?;

        let client = Client::with_config(
            OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(&config.openai_base_url),
        );

        Some(Self {
            client,
            model: config.query_model.clone(),
            max_tokens: config.query_max_tokens,
            temperature: config.query_temperature,
        })
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiGenerator {
    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, AppError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .messages([
                ChatCompletionRequestSystemMessage::from(prompt.system.clone()).into(),
                ChatCompletionRequestUserMessage::from(prompt.user.clone()).into(),
            ])
            .build()?;

        let response = self.client.chat().create(request).await?;

        debug!(model = %self.model, "received chat completion");

        let answer = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_ref())
            .ok_or_else(|| {
                AppError::Generator("no content found in completion response".into())
            })?;

        Ok(answer.clone())
    }
}
