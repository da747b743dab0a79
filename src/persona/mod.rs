// src/persona/mod.rs
// Persona dataset: records, lookup and statistics

pub mod record;
pub mod stats;
pub mod store;

pub use record::{PersonaRecord, PersonaSummary};
pub use stats::DatasetStats;
pub use store::PersonaStore;
