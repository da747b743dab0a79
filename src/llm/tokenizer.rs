// src/llm/tokenizer.rs
// Tokenizer access and context-window truncation

use anyhow::anyhow;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Result, ServiceError};
use crate::prompt::ASSISTANT_PROMPT;

/// The model tokenizer, as far as the service needs it.
pub trait PromptTokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String>;

    /// Re-tokenize `text` and decode it without special tokens, so role
    /// markers like `<|im_start|>` disappear but role names stay.
    fn strip_special_tokens(&self, text: &str) -> Result<String> {
        let ids = self.encode(text)?;
        self.decode(&ids, true)
    }
}

/// HuggingFace `tokenizer.json` loaded through the `tokenizers` crate
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
}

impl HfTokenizer {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| anyhow!("failed to load tokenizer {}: {}", path.display(), e))?;
        Ok(Self { inner })
    }
}

impl PromptTokenizer for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| ServiceError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String> {
        self.inner
            .decode(ids, skip_special_tokens)
            .map_err(|e| ServiceError::Tokenizer(e.to_string()))
    }
}

/// A generation prompt that fits the context window
#[derive(Debug, Clone, PartialEq)]
pub struct ContextWindow {
    pub text: String,
    pub input_tokens: usize,
    pub dropped_tokens: usize,
}

/// A UTF-8 character spans at most four bytes, so with a byte-level
/// vocabulary a cut inside one heals within three tokens.
const MAX_BOUNDARY_SKIP: usize = 3;

/// Fit `transcript` + the open assistant marker into `max_tokens`.
///
/// Overflow is cut from the *start* of the transcript with no summarization,
/// so long histories silently lose their earliest turns. The assistant marker
/// is tokenized separately and always survives.
///
/// Byte-level BPE tokens can split a multi-byte character. When the cut lands
/// inside one, it moves forward until the kept text decodes cleanly instead of
/// starting with U+FFFD. `input_tokens` counts our tokenization; the backend
/// re-tokenizes the text and may arrive at a slightly different number.
pub fn fit_context(
    tokenizer: &dyn PromptTokenizer,
    transcript: &str,
    max_tokens: usize,
) -> Result<ContextWindow> {
    let marker_ids = tokenizer.encode(ASSISTANT_PROMPT)?;
    let ids = tokenizer.encode(transcript)?;

    let total = ids.len() + marker_ids.len();
    if total <= max_tokens {
        return Ok(ContextWindow {
            text: format!("{}{}", transcript, ASSISTANT_PROMPT),
            input_tokens: total,
            dropped_tokens: 0,
        });
    }

    let budget = max_tokens.saturating_sub(marker_ids.len());
    let mut start = ids.len() - budget;
    let mut kept = tokenizer.decode(&ids[start..], false)?;

    let mut skipped = 0;
    while kept.starts_with(char::REPLACEMENT_CHARACTER)
        && skipped < MAX_BOUNDARY_SKIP
        && start < ids.len()
    {
        start += 1;
        skipped += 1;
        kept = tokenizer.decode(&ids[start..], false)?;
    }
    if skipped > 0 {
        debug!("Moved truncation point {} tokens forward to a character boundary", skipped);
    }

    warn!(
        "Conversation is {} tokens, dropping the earliest {} to fit {}",
        total, start, max_tokens
    );
    debug!("Truncated transcript starts with {:?}", kept.chars().take(40).collect::<String>());

    Ok(ContextWindow {
        text: format!("{}{}", kept, ASSISTANT_PROMPT),
        input_tokens: ids.len() - start + marker_ids.len(),
        dropped_tokens: start,
    })
}
