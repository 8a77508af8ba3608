//! The portable model artifact (§3, §6.3): `{Words, WordKeys, WordMap,
//! WordScores}`, serialized as JSON.
//!
//! `WordMap`/`WordScores` are keyed by the *string* representation of a
//! `WordKeys` index, matching the reference artifact's shape — `serde_json`
//! requires string map keys, and this crate does not deviate from that
//! wire format even though an array-of-structs would be more natural.

use super::{WordKey, WordScore, WordTable};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordKeyDto {
    #[serde(rename = "Pre1")]
    pub pre1: u32,
    #[serde(rename = "Pre2")]
    pub pre2: u32,
    #[serde(rename = "Pre3")]
    pub pre3: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    #[serde(rename = "Words")]
    pub words: Vec<String>,
    #[serde(rename = "WordKeys")]
    pub word_keys: Vec<WordKeyDto>,
    #[serde(rename = "WordMap")]
    pub word_map: HashMap<String, Vec<u32>>,
    #[serde(rename = "WordScores")]
    pub word_scores: HashMap<String, Vec<u32>>,
}

impl Model {
    /// Assemble the artifact from a built-and-pruned table.
    pub fn from_pruned(words: WordTable, pruned: Vec<(WordKey, Vec<WordScore>)>) -> Self {
        let mut word_keys = Vec::with_capacity(pruned.len());
        let mut word_map = HashMap::with_capacity(pruned.len());
        let mut word_scores = HashMap::with_capacity(pruned.len());

        for (i, (key, entries)) in pruned.into_iter().enumerate() {
            word_keys.push(WordKeyDto {
                pre1: key.pre1,
                pre2: key.pre2,
                pre3: key.pre3,
            });
            let idx = i.to_string();
            word_map.insert(idx.clone(), entries.iter().map(|e| e.word_id).collect());
            word_scores.insert(idx, entries.iter().map(|e| e.score).collect());
        }

        Model {
            words: words.words().to_vec(),
            word_keys,
            word_map,
            word_scores,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).wrap_err("failed to serialize model artifact")?;
        std::fs::write(path, json)
            .wrap_err_with(|| format!("failed to write model artifact to {}", path.display()))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read model artifact from {}", path.display()))?;
        serde_json::from_str(&json).wrap_err("failed to parse model artifact")
    }

    /// Rebuild the in-memory `key -> entries` view the generator walks.
    /// Entries within a key keep the serialized (already score-sorted)
    /// order.
    pub fn to_lookup(&self) -> HashMap<WordKey, Vec<WordScore>> {
        let mut out = HashMap::with_capacity(self.word_keys.len());
        for (i, dto) in self.word_keys.iter().enumerate() {
            let idx = i.to_string();
            let ids = self.word_map.get(&idx).cloned().unwrap_or_default();
            let scores = self.word_scores.get(&idx).cloned().unwrap_or_default();
            let entries = ids
                .into_iter()
                .zip(scores)
                .map(|(word_id, score)| WordScore { word_id, score })
                .collect();
            out.insert(
                WordKey::new(dto.pre1, dto.pre2, dto.pre3),
                entries,
            );
        }
        out
    }

    pub fn word(&self, id: u32) -> &str {
        self.words.get(id as usize).map(String::as_str).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markov::build::Builder;

    #[test]
    fn round_trips_through_json() {
        let mut builder = Builder::new();
        builder.ingest("A B . A C .");
        let (words, pruned) = builder.into_pruned();
        let model = Model::from_pruned(words, pruned);

        let json = serde_json::to_string(&model).unwrap();
        let back: Model = serde_json::from_str(&json).unwrap();

        assert_eq!(back.words, model.words);
        assert_eq!(back.word_keys.len(), model.word_keys.len());

        let original_lookup = model.to_lookup();
        let back_lookup = back.to_lookup();
        assert_eq!(original_lookup.len(), back_lookup.len());
        for (key, entries) in &original_lookup {
            let mut a = entries.clone();
            let mut b = back_lookup.get(key).unwrap().clone();
            a.sort_by_key(|e| e.word_id);
            b.sort_by_key(|e| e.word_id);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn uses_documented_field_names() {
        let mut builder = Builder::new();
        builder.ingest("A .");
        let (words, pruned) = builder.into_pruned();
        let model = Model::from_pruned(words, pruned);
        let json = serde_json::to_value(&model).unwrap();
        for key in ["Words", "WordKeys", "WordMap", "WordScores"] {
            assert!(json.get(key).is_some(), "missing field {key}");
        }
        let first_key = &json["WordKeys"][0];
        assert!(first_key.get("Pre1").is_some());
        assert!(first_key.get("Pre2").is_some());
        assert!(first_key.get("Pre3").is_some());
    }
}
