// src/persona/record.rs
// One row of the persona dataset and the trimmed view returned with chat replies

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::truncate_chars;

/// Biography length carried in chat responses
pub const SUMMARY_BIOGRAPHY_CHARS: usize = 200;

/// A persona as stored in the dataset.
///
/// Only the four attributes the service reads are typed; every other column
/// is kept verbatim in `extra` so `/personas/{id}` can return the full row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonaRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

impl PersonaRecord {
    pub fn biography(&self) -> Option<&str> {
        non_empty(&self.persona)
    }

    pub fn occupation(&self) -> Option<&str> {
        non_empty(&self.occupation)
    }

    /// Age 0 counts as absent, the same as a missing value.
    pub fn age(&self) -> Option<u32> {
        self.age.filter(|a| *a > 0)
    }

    pub fn region(&self) -> Option<&str> {
        non_empty(&self.region)
    }

    pub fn summary(&self) -> PersonaSummary {
        PersonaSummary {
            persona: truncate_chars(self.biography().unwrap_or(""), SUMMARY_BIOGRAPHY_CHARS)
                .to_string(),
            occupation: self.occupation().unwrap_or("").to_string(),
            age: self.age(),
            region: self.region().unwrap_or("").to_string(),
        }
    }
}

/// `persona_info` in a chat response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonaSummary {
    pub persona: String,
    #[serde(default)]
    pub occupation: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub region: String,
}
