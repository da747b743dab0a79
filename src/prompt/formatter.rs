// src/prompt/formatter.rs
// ChatML serialization of a conversation (the dialogue markup Qwen3 was trained on)

use crate::llm::provider::{ChatTurn, Role};

pub const IM_START: &str = "<|im_start|>";
pub const IM_END: &str = "<|im_end|>";

/// Open assistant turn appended after the history so the model continues it
pub const ASSISTANT_PROMPT: &str = "<|im_start|>assistant\n";

pub fn format_turn(role: Role, content: &str) -> String {
    format!("{}{}\n{}{}\n", IM_START, role.as_str(), content, IM_END)
}

/// Closed turns only: the system prompt followed by the caller history.
pub fn format_transcript(system_prompt: &str, history: &[ChatTurn]) -> String {
    let mut out = format_turn(Role::System, system_prompt);
    for turn in history {
        out.push_str(&format_turn(turn.role, &turn.content));
    }
    out
}

/// Full generation prompt: transcript plus the open assistant marker.
pub fn format_conversation(system_prompt: &str, history: &[ChatTurn]) -> String {
    let mut out = format_transcript(system_prompt, history);
    out.push_str(ASSISTANT_PROMPT);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_conversation_exact_markup() {
        let history = vec![ChatTurn::user("こんにちは"), ChatTurn::assistant("どうも")];
        let text = format_conversation("SYS", &history);
        assert_eq!(
            text,
            "<|im_start|>system\nSYS<|im_end|>\n\
             <|im_start|>user\nこんにちは<|im_end|>\n\
             <|im_start|>assistant\nどうも<|im_end|>\n\
             <|im_start|>assistant\n"
        );
    }

    #[test]
    fn test_empty_history_still_prompts_assistant() {
        let text = format_conversation("SYS", &[]);
        assert!(text.starts_with("<|im_start|>system\nSYS<|im_end|>\n"));
        assert!(text.ends_with(ASSISTANT_PROMPT));
    }

    #[test]
    fn test_order_is_preserved() {
        let history = vec![ChatTurn::user("1"), ChatTurn::user("2"), ChatTurn::user("3")];
        let text = format_transcript("s", &history);
        let positions: Vec<usize> = ["\n1<", "\n2<", "\n3<"]
            .iter()
            .map(|needle| text.find(needle).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
