//! Build pass (§4.E.1) and pruning pass (§4.E.2).

use super::{WORD_ID_DOT, WordKey, WordScore, WordTable};
use crate::normalize::tokenize;
use std::collections::HashMap;

/// Accumulates `{word_id -> score}` for every context key seen while
/// scanning comment text. Order of first appearance within a key's entry
/// list is not preserved — only the final sorted/pruned list is.
#[derive(Default)]
pub struct Builder {
    pub words: WordTable,
    table: HashMap<WordKey, Vec<WordScore>>,
}

impl Builder {
    pub fn new() -> Self {
        Builder {
            words: WordTable::new(),
            table: HashMap::new(),
        }
    }

    fn bump(&mut self, key: WordKey, word_id: u32) {
        let entries = self.table.entry(key).or_default();
        if let Some(existing) = entries.iter_mut().find(|e| e.word_id == word_id) {
            existing.score += 1;
        } else {
            entries.push(WordScore { word_id, score: 1 });
        }
    }

    /// Scan one already-normalized comment's text, sliding the
    /// `(pre1, pre2, pre3)` window and emitting the forward-lookup
    /// observations described in §4.E.1.
    pub fn ingest(&mut self, text: &str) {
        let tokens = tokenize(text);

        let mut pre1 = WORD_ID_DOT;
        let mut pre2 = 0u32;
        let mut pre3 = 0u32;

        for token in tokens {
            let word_id = self.words.intern(&token);

            self.bump(WordKey::new(pre1, 0, 0), word_id);
            if pre2 > 0 {
                self.bump(WordKey::new(pre1, pre2, 0), word_id);
                if pre3 > 0 {
                    self.bump(WordKey::new(pre1, pre2, pre3), word_id);
                }
            }

            pre3 = pre2;
            pre2 = pre1;
            pre1 = word_id;
        }
    }

    /// Apply the §4.E.2 pruning policy to every accumulated key and return
    /// the result in a stable order (sorted by key fields), ready to
    /// serialize.
    pub fn into_pruned(self) -> (WordTable, Vec<(WordKey, Vec<WordScore>)>) {
        let mut keys: Vec<WordKey> = self.table.keys().copied().collect();
        keys.sort_by_key(|k| (k.pre1, k.pre2, k.pre3));

        let pruned = keys
            .into_iter()
            .map(|key| {
                let entries = self.table.get(&key).unwrap().clone();
                (key, prune_with_words(entries, &self.words))
            })
            .collect();
        (self.words, pruned)
    }
}

/// Same as [`prune`] but able to re-sort all-tied-at-one lists by descending
/// token length, per §4.E.2.
pub fn prune_with_words(mut entries: Vec<WordScore>, words: &WordTable) -> Vec<WordScore> {
    if entries.len() <= 1 {
        return entries;
    }

    entries.sort_by(|a, b| b.score.cmp(&a.score));
    let max_score = entries[0].score;

    if max_score == 1 {
        entries.sort_by(|a, b| words.word(b.word_id).len().cmp(&words.word(a.word_id).len()));
    }

    let mut out = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        if i >= 3 {
            if max_score == 1 {
                break;
            }
            if max_score >= 10 && entry.score < 10 {
                break;
            }
            if entry.score <= 2 {
                break;
            }
        }
        out.push(entry);
    }
    out
}
