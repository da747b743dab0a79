// src/llm/mod.rs
// Model side: backend trait, HTTP backend, tokenizer and reply cleanup

pub mod completions;
pub mod postprocess;
pub mod provider;
pub mod tokenizer;

pub use completions::CompletionsClient;
pub use postprocess::{extract_reply, strip_think_blocks};
pub use provider::{ChatTurn, GenerationParams, Role, TextGenerator};
pub use tokenizer::{fit_context, ContextWindow, HfTokenizer, PromptTokenizer};
