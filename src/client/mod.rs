// src/client/mod.rs
// Terminal chat client for a running server

pub mod http;
pub mod repl;
pub mod session;

pub use http::{ClientError, PersonaChatClient};
pub use repl::Repl;
pub use session::{ChatSession, GenerationSettings, PersonaCard, PersonaSelection, SessionPhase};
