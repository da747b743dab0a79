// src/lib.rs

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod llm;
pub mod persona;
pub mod prompt;
pub mod services;
pub mod startup;
pub mod state;
pub mod utils;
