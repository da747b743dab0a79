// src/llm/postprocess.rs
// Turns decoded model output into the reply shown to the user

use once_cell::sync::Lazy;
use regex::Regex;

static THINK_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid think-block regex"));

static THINK_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?think[^>]*>").expect("valid think-tag regex"));

const ROLE_SPLIT_TOKEN: &str = "assistant";

/// Remove `<think>…</think>` blocks (across newlines) and any unpaired tag left over.
pub fn strip_think_blocks(text: &str) -> String {
    let without_blocks = THINK_BLOCK.replace_all(text, "");
    THINK_TAG.replace_all(&without_blocks, "").into_owned()
}

/// Clean reply extracted from a full decoded sequence.
///
/// The decoded text still contains the role names of every turn, so the
/// reply is whatever follows the *last* literal "assistant". This is a
/// heuristic: if the reply itself mentions "assistant", everything up to
/// that mention is lost. Without any "assistant" the whole cleaned text is
/// returned.
pub fn extract_reply(decoded: &str) -> String {
    let cleaned = strip_think_blocks(decoded);
    let reply = match cleaned.rfind(ROLE_SPLIT_TOKEN) {
        Some(pos) => &cleaned[pos + ROLE_SPLIT_TOKEN.len()..],
        None => cleaned.as_str(),
    };
    reply.trim().to_string()
}
