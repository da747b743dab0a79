// src/prompt/builder.rs
// Persona system prompt

use crate::persona::PersonaRecord;

/// Used when a persona has none of the four fields filled in
pub const FALLBACK_PERSONA_LINE: &str = "一般的な日本人";

const BIOGRAPHY_LABEL: &str = "人物像";
const OCCUPATION_LABEL: &str = "職業";
const AGE_LABEL: &str = "年齢";
const REGION_LABEL: &str = "出身・居住地";

/// One labeled line per present field, always in the order
/// biography, occupation, age, region.
pub fn persona_lines(persona: &PersonaRecord) -> Vec<String> {
    let mut lines = Vec::with_capacity(4);
    if let Some(biography) = persona.biography() {
        lines.push(format!("{}：{}", BIOGRAPHY_LABEL, biography));
    }
    if let Some(occupation) = persona.occupation() {
        lines.push(format!("{}：{}", OCCUPATION_LABEL, occupation));
    }
    if let Some(age) = persona.age() {
        lines.push(format!("{}：{}歳", AGE_LABEL, age));
    }
    if let Some(region) = persona.region() {
        lines.push(format!("{}：{}", REGION_LABEL, region));
    }
    lines
}

/// Builds the system turn that makes the model speak as `persona`.
pub fn build_system_prompt(persona: &PersonaRecord) -> String {
    let lines = persona_lines(persona);
    let profile = if lines.is_empty() {
        FALLBACK_PERSONA_LINE.to_string()
    } else {
        lines.join("\n")
    };

    let mut prompt = String::new();
    prompt.push_str("あなたは以下のペルソナの人物として、その人になりきって自然な日本語で返答してください。");
    prompt.push_str("メタ的な説明や分析は一切せず、その人物そのものとして話してください。\n\n");
    prompt.push_str("【あなたの人物像】\n");
    prompt.push_str(&profile);
    prompt.push_str("\n\n");
    prompt.push_str("この人物として、自然な口調と視点で会話してください。");
    prompt.push_str("その人の経験、価値観、話し方で返答してください。");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled_lines(prompt: &str) -> Vec<&str> {
        prompt
            .lines()
            .filter(|l| {
                [BIOGRAPHY_LABEL, OCCUPATION_LABEL, AGE_LABEL, REGION_LABEL]
                    .iter()
                    .any(|label| l.starts_with(&format!("{}：", label)))
            })
            .collect()
    }

    #[test]
    fn test_occupation_and_age_only() {
        let persona = PersonaRecord {
            occupation: Some("看護師".into()),
            age: Some(30),
            region: Some(String::new()),
            ..PersonaRecord::default()
        };
        let prompt = build_system_prompt(&persona);
        assert_eq!(labeled_lines(&prompt), vec!["職業：看護師", "年齢：30歳"]);
        assert!(!prompt.contains(FALLBACK_PERSONA_LINE));
    }

    #[test]
    fn test_all_fields_in_fixed_order() {
        let persona = PersonaRecord {
            persona: Some("絵を描くのが好き".into()),
            occupation: Some("芸術家".into()),
            age: Some(35),
            region: Some("近畿地方".into()),
            ..PersonaRecord::default()
        };
        assert_eq!(
            persona_lines(&persona),
            vec!["人物像：絵を描くのが好き", "職業：芸術家", "年齢：35歳", "出身・居住地：近畿地方"]
        );
    }

    #[test]
    fn test_empty_persona_uses_fallback_line() {
        let prompt = build_system_prompt(&PersonaRecord::default());
        assert!(labeled_lines(&prompt).is_empty());
        assert!(prompt.contains(&format!("【あなたの人物像】\n{}\n", FALLBACK_PERSONA_LINE)));
    }

    #[test]
    fn test_prompt_forbids_meta_commentary() {
        let prompt = build_system_prompt(&PersonaRecord::default());
        assert!(prompt.starts_with("あなたは以下のペルソナの人物として"));
        assert!(prompt.contains("メタ的な説明や分析は一切せず"));
    }
}
