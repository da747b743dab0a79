// src/client/session.rs
// Client-side conversation state: persona selection, settings and turn lifecycle

use rand::Rng;
use thiserror::Error;

use crate::api::types::{ChatRequest, ChatResponse};
use crate::llm::{strip_think_blocks, ChatTurn};
use crate::persona::stats::UNKNOWN_LABEL;
use crate::persona::{PersonaRecord, PersonaSummary};
use crate::utils::truncate_with_ellipsis;

/// Largest index the selector offers; the full dataset has one million rows
pub const MAX_PERSONA_INDEX: i64 = 999_999;

/// Biography length shown on the persona card
pub const CARD_BIOGRAPHY_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecommendedPersona {
    pub label: &'static str,
    pub index: i64,
}

const fn recommended(label: &'static str, index: i64) -> RecommendedPersona {
    RecommendedPersona { label, index }
}

/// Curated starting points, spread across the dataset
pub static RECOMMENDED_PERSONAS: [RecommendedPersona; 8] = [
    recommended("東京の介護福祉士（72歳女性）", 0),
    recommended("大阪の教師（45歳男性）", 1000),
    recommended("札幌の看護師（30歳女性）", 2000),
    recommended("福岡の営業（28歳男性）", 3000),
    recommended("名古屋の主婦（55歳女性）", 4000),
    recommended("仙台の学生（22歳女性）", 5000),
    recommended("広島の医師（40歳男性）", 6000),
    recommended("京都の芸術家（35歳女性）", 7000),
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Still waiting for the previous reply")]
    AwaitingReply,
    #[error("No request in flight")]
    NotAwaiting,
    #[error("Persona index {0} is outside 0..=999999")]
    IndexOutOfRange(i64),
    #[error("No recommended persona numbered {0}")]
    UnknownRecommendation(usize),
    #[error("{0}")]
    InvalidSetting(String),
}

/// How the current persona was chosen
#[derive(Debug, Clone, PartialEq)]
pub enum PersonaSelection {
    Recommended(&'static RecommendedPersona),
    Random(i64),
    Direct(i64),
}

impl PersonaSelection {
    /// Zero-based position in `RECOMMENDED_PERSONAS`
    pub fn recommended(position: usize) -> Result<Self, SessionError> {
        RECOMMENDED_PERSONAS
            .get(position)
            .map(Self::Recommended)
            .ok_or(SessionError::UnknownRecommendation(position + 1))
    }

    pub fn random() -> Self {
        Self::Random(rand::rng().random_range(0..=MAX_PERSONA_INDEX))
    }

    pub fn direct(index: i64) -> Result<Self, SessionError> {
        if (0..=MAX_PERSONA_INDEX).contains(&index) {
            Ok(Self::Direct(index))
        } else {
            Err(SessionError::IndexOutOfRange(index))
        }
    }

    pub fn index(&self) -> i64 {
        match self {
            Self::Recommended(persona) => persona.index,
            Self::Random(index) | Self::Direct(index) => *index,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Recommended(persona) => persona.label.to_string(),
            Self::Random(index) => format!("ランダム #{}", index),
            Self::Direct(index) => format!("#{}", index),
        }
    }
}

impl Default for PersonaSelection {
    fn default() -> Self {
        Self::Recommended(&RECOMMENDED_PERSONAS[0])
    }
}

pub const UI_DEFAULT_MAX_NEW_TOKENS: u32 = 2000;
pub const UI_MIN_MAX_NEW_TOKENS: u32 = 50;
pub const UI_MAX_MAX_NEW_TOKENS: u32 = 5000;
pub const UI_DEFAULT_TEMPERATURE: f32 = 0.7;
pub const UI_DEFAULT_TOP_P: f32 = 0.9;

/// Sampling settings the user can tweak between turns
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_new_tokens: UI_DEFAULT_MAX_NEW_TOKENS,
            temperature: UI_DEFAULT_TEMPERATURE,
            top_p: UI_DEFAULT_TOP_P,
        }
    }
}

impl GenerationSettings {
    /// Apply one `key=value` pair, e.g. `temperature=0.3`.
    pub fn apply(&mut self, assignment: &str) -> Result<(), SessionError> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| SessionError::InvalidSetting(format!("expected key=value, got '{}'", assignment)))?;
        let invalid = |what: &str| SessionError::InvalidSetting(format!("{} must be {}", key, what));

        match key.trim() {
            "max_tokens" | "max_new_tokens" => {
                let v: u32 = value.trim().parse().map_err(|_| invalid("an integer"))?;
                if !(UI_MIN_MAX_NEW_TOKENS..=UI_MAX_MAX_NEW_TOKENS).contains(&v) {
                    return Err(invalid("between 50 and 5000"));
                }
                self.max_new_tokens = v;
            }
            "temperature" | "top_p" => {
                let v: f32 = value.trim().parse().map_err(|_| invalid("a number"))?;
                if !(0.0..=1.0).contains(&v) {
                    return Err(invalid("between 0.0 and 1.0"));
                }
                if key.trim() == "temperature" {
                    self.temperature = v;
                } else {
                    self.top_p = v;
                }
            }
            other => {
                return Err(SessionError::InvalidSetting(format!("unknown setting '{}'", other)));
            }
        }
        Ok(())
    }
}

/// Remove reasoning markup a model may leak into its reply.
pub fn clean_reply(reply: &str) -> String {
    strip_think_blocks(reply).trim().to_string()
}

/// What the persona card displays. Built from either a full record
/// (`/personas/{id}`) or the summary attached to a chat reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonaCard {
    pub occupation: Option<String>,
    pub age: Option<u32>,
    pub region: Option<String>,
    pub biography: Option<String>,
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

impl From<&PersonaRecord> for PersonaCard {
    fn from(record: &PersonaRecord) -> Self {
        Self {
            occupation: record.occupation().map(str::to_string),
            age: record.age(),
            region: record.region().map(str::to_string),
            biography: record.biography().map(str::to_string),
        }
    }
}

impl From<&PersonaSummary> for PersonaCard {
    fn from(summary: &PersonaSummary) -> Self {
        Self {
            occupation: non_empty(&summary.occupation),
            age: summary.age.filter(|a| *a > 0),
            region: non_empty(&summary.region),
            biography: non_empty(&summary.persona),
        }
    }
}

impl PersonaCard {
    pub fn render(&self) -> String {
        let age = match self.age {
            Some(age) => format!("{}歳", age),
            None => UNKNOWN_LABEL.to_string(),
        };
        let mut out = format!(
            "職業: {}\n年齢: {}\n地域: {}",
            self.occupation.as_deref().unwrap_or(UNKNOWN_LABEL),
            age,
            self.region.as_deref().unwrap_or(UNKNOWN_LABEL),
        );
        if let Some(bio) = &self.biography {
            out.push_str("\n\n");
            out.push_str(&truncate_with_ellipsis(bio, CARD_BIOGRAPHY_CHARS));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    AwaitingReply,
}

/// Interactive conversation state. The server is stateless, so the whole
/// history lives here and is resent with every turn.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    history: Vec<ChatTurn>,
    selection: PersonaSelection,
    settings: GenerationSettings,
    current_persona: Option<PersonaCard>,
    awaiting: bool,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.awaiting {
            SessionPhase::AwaitingReply
        } else {
            SessionPhase::Idle
        }
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn selection(&self) -> &PersonaSelection {
        &self.selection
    }

    pub fn persona_index(&self) -> i64 {
        self.selection.index()
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut GenerationSettings {
        &mut self.settings
    }

    pub fn current_persona(&self) -> Option<&PersonaCard> {
        self.current_persona.as_ref()
    }

    /// Switching persona keeps the history; the next turn is answered
    /// by the new persona.
    pub fn select(&mut self, selection: PersonaSelection) {
        if selection.index() != self.selection.index() {
            self.current_persona = None;
        }
        self.selection = selection;
    }

    pub fn set_persona_card(&mut self, card: PersonaCard) {
        self.current_persona = Some(card);
    }

    /// Record the user's message and build the request for it.
    pub fn begin_turn(&mut self, message: &str) -> Result<ChatRequest, SessionError> {
        if self.awaiting {
            return Err(SessionError::AwaitingReply);
        }
        let message = message.trim();
        if message.is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        self.history.push(ChatTurn::user(message));
        self.awaiting = true;

        Ok(ChatRequest {
            messages: self.history.clone(),
            persona_index: self.persona_index(),
            max_new_tokens: self.settings.max_new_tokens,
            temperature: self.settings.temperature,
            top_p: self.settings.top_p,
        })
    }

    /// Append the cleaned reply and return it.
    pub fn complete_turn(&mut self, response: ChatResponse) -> Result<String, SessionError> {
        if !self.awaiting {
            return Err(SessionError::NotAwaiting);
        }
        let reply = clean_reply(&response.reply);
        self.history.push(ChatTurn::assistant(reply.clone()));
        self.current_persona = Some(PersonaCard::from(&response.persona_info));
        self.awaiting = false;
        Ok(reply)
    }

    /// The request failed. The user turn stays so the next message retries
    /// with the full context.
    pub fn fail_turn(&mut self) -> Result<(), SessionError> {
        if !self.awaiting {
            return Err(SessionError::NotAwaiting);
        }
        self.awaiting = false;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.awaiting = false;
    }
}
