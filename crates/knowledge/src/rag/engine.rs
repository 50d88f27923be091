//! Grounded answer generation.
//!
//! Retrieves relevant chunks, renders them with the conversation history
//! into a prompt, asks the LLM and attributes the answer to its sources.

use crate::rag::types::{Answer, Conversation, SourceRef};
use crate::retriever::Retriever;
use notewise_core::{AppError, AppResult, CallContext};
use notewise_llm::{LlmClient, LlmRequest};
use notewise_prompt::PromptBuilder;
use std::sync::Arc;

/// Tunables for [`GenerationEngine`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// LLM model identifier
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,

    /// Chunks retrieved per question
    pub top_k: usize,

    /// Character budget of each source preview
    pub preview_chars: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: Some(0.2),
            max_tokens: Some(1024),
            top_k: 4,
            preview_chars: 200,
        }
    }
}

/// Shared, stateless answering pipeline. Conversation state lives in the
/// [`Conversation`] passed to [`GenerationEngine::answer`].
pub struct GenerationEngine {
    retriever: Retriever,
    llm: Arc<dyn LlmClient>,
    prompt: PromptBuilder,
    settings: EngineSettings,
}

impl GenerationEngine {
    pub fn new(
        retriever: Retriever,
        llm: Arc<dyn LlmClient>,
        prompt: PromptBuilder,
        settings: EngineSettings,
    ) -> Self {
        Self {
            retriever,
            llm,
            prompt,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Answer `message` in the context of `conversation`.
    ///
    /// On success the question and answer are appended to the conversation.
    /// On failure the conversation is left untouched; LLM failures surface as
    /// [`AppError::Generation`], retrieval failures as
    /// [`AppError::Retrieval`].
    pub async fn answer(
        &self,
        conversation: &mut Conversation,
        message: &str,
        ctx: &CallContext,
    ) -> AppResult<Answer> {
        let retrieved = self
            .retriever
            .retrieve(message, self.settings.top_k, ctx)
            .await?;

        let context: Vec<String> = retrieved.iter().map(|r| r.chunk.text.clone()).collect();
        let built = self.prompt.build(conversation.turns(), &context, message)?;

        let mut request = LlmRequest::new(built.user, &self.settings.model).with_system(built.system);
        if let Some(temperature) = self.settings.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.settings.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        tracing::debug!(
            provider = self.llm.provider_name(),
            model = %self.settings.model,
            chunks = retrieved.len(),
            history_turns = built.history_turns,
            "Generating answer"
        );

        let response = ctx
            .run("generation", self.llm.complete(&request))
            .await
            .map_err(AppError::into_generation)?;

        conversation.record_exchange(message, response.content.clone());

        let sources = retrieved
            .iter()
            .map(|r| SourceRef::from_scored(r, self.settings.preview_chars))
            .collect();

        Ok(Answer {
            response: response.content,
            sources,
        })
    }
}
