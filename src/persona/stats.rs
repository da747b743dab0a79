// src/persona/stats.rs
// Dataset statistics: occupations, regions and age decades

use serde::ser::{Serialize, Serializer};
use std::collections::HashMap;

use super::store::PersonaStore;

/// Label for records that lack the field entirely
pub const UNKNOWN_LABEL: &str = "不明";

const TOP_OCCUPATIONS: usize = 10;

/// Ordered `label -> count` pairs, serialized as a JSON object in this order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountTable(pub Vec<(String, usize)>);

impl CountTable {
    pub fn get(&self, label: &str) -> Option<usize> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, c)| *c)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.0.iter().map(|(l, _)| l.as_str()).collect()
    }
}

impl Serialize for CountTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DatasetStats {
    pub total_personas: usize,
    /// Ten most common occupations as `[label, count]` pairs, most common first
    pub top_occupations: Vec<(String, usize)>,
    /// Every region, most common first
    pub regions: CountTable,
    /// Decade buckets ("20代", "30代", ...) in ascending age order
    pub age_groups: CountTable,
}

/// Highest count first; equal counts fall back to label order so the output
/// never depends on hash iteration order.
fn by_count_desc(counts: HashMap<&str, usize>) -> Vec<(String, usize)> {
    let mut pairs: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(label, count)| (label.to_string(), count))
        .collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    pairs
}

impl DatasetStats {
    /// Scan the whole store once. Not cached: the dataset is static and the
    /// endpoint is rarely called.
    pub fn compute(store: &PersonaStore) -> Self {
        let mut occupations: HashMap<&str, usize> = HashMap::new();
        let mut regions: HashMap<&str, usize> = HashMap::new();
        let mut decades: HashMap<u32, usize> = HashMap::new();

        for record in store.iter() {
            let occupation = record.occupation.as_deref().unwrap_or(UNKNOWN_LABEL);
            *occupations.entry(occupation).or_insert(0) += 1;

            let region = record.region.as_deref().unwrap_or(UNKNOWN_LABEL);
            *regions.entry(region).or_insert(0) += 1;

            if let Some(age) = record.age() {
                *decades.entry(age / 10 * 10).or_insert(0) += 1;
            }
        }

        let mut top_occupations = by_count_desc(occupations);
        top_occupations.truncate(TOP_OCCUPATIONS);

        let mut age_groups: Vec<(u32, usize)> = decades.into_iter().collect();
        age_groups.sort_by_key(|(decade, _)| *decade);

        Self {
            total_personas: store.len(),
            top_occupations,
            regions: CountTable(by_count_desc(regions)),
            age_groups: CountTable(
                age_groups
                    .into_iter()
                    .map(|(decade, count)| (format!("{}代", decade), count))
                    .collect(),
            ),
        }
    }
}
