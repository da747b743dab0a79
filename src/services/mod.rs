// src/services/mod.rs
// Service module exports

pub mod chat;

pub use chat::{ChatInput, ChatOutcome, ChatService};
