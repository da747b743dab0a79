// src/persona/store.rs
// Read-only persona collection, loaded once at startup

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

use super::record::PersonaRecord;
use crate::error::ServiceError;

/// The full persona dataset, indexed by position.
#[derive(Debug, Default)]
pub struct PersonaStore {
    records: Vec<PersonaRecord>,
}

impl PersonaStore {
    pub fn from_records(records: Vec<PersonaRecord>) -> Self {
        Self { records }
    }

    /// Load a dataset file.
    ///
    /// `.json` files hold one array of records; anything else is read as
    /// JSON Lines (one record per line, blank lines ignored).
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading persona dataset from {}", path.display());

        let file = File::open(path)
            .with_context(|| format!("failed to open persona dataset {}", path.display()))?;

        let is_json_array = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let records = if is_json_array {
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("invalid JSON array in {}", path.display()))?
        } else {
            Self::read_jsonl(BufReader::new(file))?
        };

        info!("Loaded {} personas", records.len());
        Ok(Self { records })
    }

    fn read_jsonl(reader: impl BufRead) -> Result<Vec<PersonaRecord>> {
        let mut records = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("failed to read line {}", line_no + 1))?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let record: PersonaRecord = serde_json::from_str(trimmed)
                .with_context(|| format!("invalid persona record on line {}", line_no + 1))?;
            records.push(record);
        }
        debug!("Parsed {} JSONL persona rows", records.len());
        Ok(records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a persona; negative and out-of-range indices yield `None`.
    pub fn get(&self, index: i64) -> Option<&PersonaRecord> {
        usize::try_from(index).ok().and_then(|i| self.records.get(i))
    }

    /// Like `get`, but reports a miss as `PersonaNotFound`.
    pub fn resolve(&self, index: i64) -> Result<&PersonaRecord, ServiceError> {
        self.get(index).ok_or(ServiceError::PersonaNotFound {
            index,
            total: self.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &PersonaRecord> {
        self.records.iter()
    }
}
