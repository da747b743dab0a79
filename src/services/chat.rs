// src/services/chat.rs
// Chat completion: persona resolution, prompt assembly, generation and fallback

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{Result, ServiceError};
use crate::llm::{extract_reply, fit_context, ChatTurn, GenerationParams};
use crate::persona::{PersonaRecord, PersonaSummary};
use crate::prompt::{build_system_prompt, format_transcript};
use crate::state::{ModelHandle, ServiceContext};
use crate::utils::truncate_chars;

/// Closing sentence of every fallback reply
pub const FALLBACK_GREETING: &str = "こんにちは！何かお手伝いできることはありますか？";
/// Biography used by the fallback when a record has no `persona` field
pub const FALLBACK_BIOGRAPHY: &str = "日本人です";
/// How much of the biography a fallback reply quotes
pub const FALLBACK_BIOGRAPHY_CHARS: usize = 100;

/// One chat call: the caller owns the history, the server keeps nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatInput {
    pub history: Vec<ChatTurn>,
    pub persona_index: i64,
    pub params: GenerationParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatOutcome {
    pub reply: String,
    pub persona_info: PersonaSummary,
    /// True when the reply was templated because no model is loaded
    pub fallback: bool,
}

/// Templated reply used when the model is unavailable.
pub fn fallback_reply(persona: &PersonaRecord) -> ChatOutcome {
    let biography = persona.persona.as_deref().unwrap_or(FALLBACK_BIOGRAPHY);
    let reply = format!(
        "{}... {}",
        truncate_chars(biography, FALLBACK_BIOGRAPHY_CHARS),
        FALLBACK_GREETING
    );

    let mut persona_info = persona.summary();
    persona_info.persona =
        truncate_chars(biography, crate::persona::record::SUMMARY_BIOGRAPHY_CHARS).to_string();

    ChatOutcome {
        reply,
        persona_info,
        fallback: true,
    }
}

pub struct ChatService {
    context: ServiceContext,
}

impl ChatService {
    pub fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    /// Answer the last user turn as the selected persona.
    ///
    /// Checks run in a fixed order: startup state, persona index, sampling
    /// parameters. Nothing is generated unless all of them pass.
    #[instrument(
        skip(self, input),
        fields(
            request_id = %Uuid::new_v4(),
            persona_index = input.persona_index,
            turns = input.history.len()
        )
    )]
    pub async fn chat(&self, input: &ChatInput) -> Result<ChatOutcome> {
        let resources = self.context.ready()?;
        let personas = resources
            .personas
            .as_ref()
            .ok_or(ServiceError::PersonasNotLoaded)?;

        let persona = personas
            .get(input.persona_index)
            .ok_or(ServiceError::InvalidPersonaIndex {
                index: input.persona_index,
                total: personas.len(),
            })?;

        input
            .params
            .validate(self.context.settings().max_new_tokens_limit)?;

        let Some(model) = &resources.model else {
            warn!("Model not loaded, answering with fallback reply");
            return Ok(fallback_reply(persona));
        };

        match self.generate(model, persona, input).await {
            Ok(reply) => {
                info!(reply_chars = reply.chars().count(), "chat reply generated");
                Ok(ChatOutcome {
                    reply,
                    persona_info: persona.summary(),
                    fallback: false,
                })
            }
            Err(e) => {
                error!("Chat error: {}", e);
                Err(e)
            }
        }
    }

    async fn generate(
        &self,
        model: &ModelHandle,
        persona: &PersonaRecord,
        input: &ChatInput,
    ) -> Result<String> {
        let system_prompt = build_system_prompt(persona);
        let transcript = format_transcript(&system_prompt, &input.history);

        let window = fit_context(
            model.tokenizer.as_ref(),
            &transcript,
            self.context.settings().max_context_tokens,
        )?;
        info!(
            backend = model.generator.name(),
            input_tokens = window.input_tokens,
            dropped_tokens = window.dropped_tokens,
            "running generation"
        );

        let raw = model.generator.generate(&window.text, &input.params).await?;
        let decoded = model.tokenizer.strip_special_tokens(&raw)?;
        Ok(extract_reply(&decoded))
    }
}
