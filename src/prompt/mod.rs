// src/prompt/mod.rs
// Prompt construction: persona system prompt and dialogue markup

pub mod builder;
pub mod formatter;

pub use builder::{build_system_prompt, persona_lines, FALLBACK_PERSONA_LINE};
pub use formatter::{format_conversation, format_transcript, ASSISTANT_PROMPT};
