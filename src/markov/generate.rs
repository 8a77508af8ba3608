//! Generation (§4.E.3) and rendering (§4.E.4).

use super::model::Model;
use super::{WORD_ID_DOT, WordKey, WordScore};
use crate::normalize::{is_punctuation, tokenize};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

pub struct TalkParams {
    pub continuity: u32,
    pub stability: u32,
    pub talk_init: String,
    pub rand_init: u64,
    pub rand_talk: u64,
}

/// Seed `0` derives from the clock, matching §6's documented default.
fn resolve_seed(seed: u64) -> u64 {
    if seed != 0 {
        return seed;
    }
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

struct Window {
    pre1: u32,
    pre2: u32,
    pre3: u32,
}

impl Window {
    fn key(&self) -> WordKey {
        WordKey::new(self.pre1, self.pre2, self.pre3)
    }

    fn backoff_2(&self) -> WordKey {
        WordKey::new(self.pre1, self.pre2, 0)
    }

    fn backoff_1(&self) -> WordKey {
        WordKey::new(self.pre1, 0, 0)
    }

    fn advance(&mut self, word_id: u32) {
        self.pre3 = self.pre2;
        self.pre2 = self.pre1;
        self.pre1 = word_id;
    }
}

/// Seed the generator, either from a random post-period context or from a
/// tokenized `talk_init` phrase (§4.E.3).
fn seed_window(
    model: &Model,
    lookup: &HashMap<WordKey, Vec<WordScore>>,
    params: &TalkParams,
    rand_init: &mut StdRng,
) -> (Window, Vec<u32>) {
    if params.talk_init.trim().is_empty() {
        // Deterministic order: the serialized `WordKeys` sequence, not the
        // in-memory lookup map (§9 design note).
        let keys_after_dot: Vec<WordKey> = model
            .word_keys
            .iter()
            .filter(|dto| dto.pre1 == WORD_ID_DOT)
            .map(|dto| WordKey::new(dto.pre1, dto.pre2, dto.pre3))
            .collect();

        let chosen_key = keys_after_dot[rand_init.gen_range(0..keys_after_dot.len())];
        let entries = lookup.get(&chosen_key).cloned().unwrap_or_default();
        let word_id = entries[rand_init.gen_range(0..entries.len())].word_id;

        (
            Window {
                pre1: word_id,
                pre2: 0,
                pre3: 0,
            },
            vec![word_id],
        )
    } else {
        let tokens = tokenize(&params.talk_init);
        let ids: Vec<u32> = tokens
            .iter()
            .map(|t| model.words.iter().position(|w| w == t).map(|i| i as u32).unwrap_or(0))
            .collect();

        let mut pre1 = WORD_ID_DOT;
        let mut pre2 = 0u32;
        let mut pre3 = 0u32;
        for &id in &ids {
            pre3 = pre2;
            pre2 = pre1;
            pre1 = id;
        }

        (Window { pre1, pre2, pre3 }, Vec::new())
    }
}

/// §4.E.3 step 2: the "stability" truncation. `stability > 1` (not `> 0` —
/// this is a documented source quirk, not a bug we get to fix) retains only
/// the top `max(1, ceil((1 - stability/100) * n))` candidates.
fn stability_cutoff(n: usize, stability: u32) -> usize {
    if stability > 1 && n > 1 {
        let frac = 1.0 - (stability as f64 / 100.0);
        let kept = (frac * n as f64).ceil() as usize;
        kept.max(1)
    } else {
        n
    }
}

fn select_key<'a>(
    lookup: &'a HashMap<WordKey, Vec<WordScore>>,
    window: &Window,
    chain: u32,
    continuity: u32,
) -> Option<(&'a [WordScore], u32)> {
    if chain <= continuity
        && let Some(entries) = lookup.get(&window.key())
        && !entries.is_empty()
    {
        return Some((entries, chain));
    }

    if let Some(entries) = lookup.get(&window.backoff_2())
        && !entries.is_empty()
    {
        let chain = if entries.len() > 1 { 0 } else { chain };
        return Some((entries, chain));
    }

    if let Some(entries) = lookup.get(&window.backoff_1())
        && !entries.is_empty()
    {
        return Some((entries, chain));
    }

    None
}

/// Produce `talk_count` utterances from a loaded model.
pub fn talk(model: &Model, talk_count: u32, params: &TalkParams) -> Vec<String> {
    let lookup = model.to_lookup();
    let mut rand_init = StdRng::seed_from_u64(resolve_seed(params.rand_init));
    let mut rand_talk = StdRng::seed_from_u64(resolve_seed(params.rand_talk));

    (0..talk_count)
        .map(|_| {
            let (mut window, mut ids) = seed_window(model, &lookup, params, &mut rand_init);
            let mut chain = 0u32;
            let mut sentences = if ids.last().copied() == Some(WORD_ID_DOT) { 1 } else { 0 };

            for _ in 0..1000 {
                if sentences >= 3 {
                    break;
                }

                let word_id = match select_key(&lookup, &window, chain, params.continuity) {
                    None => {
                        chain = 0;
                        WORD_ID_DOT
                    }
                    Some((entries, new_chain)) => {
                        chain = new_chain;
                        let n = stability_cutoff(entries.len(), params.stability);
                        let candidates = &entries[..n];

                        if candidates.len() == 1 {
                            chain += 1;
                            candidates[0].word_id
                        } else {
                            let total: u32 = candidates.iter().map(|e| e.score).sum();
                            let r = rand_talk.gen_range(0..total);
                            let mut acc = 0u32;
                            let mut picked = candidates[0].word_id;
                            for c in candidates {
                                acc += c.score;
                                if acc > r {
                                    picked = c.word_id;
                                    break;
                                }
                            }
                            chain = 0;
                            picked
                        }
                    }
                };

                ids.push(word_id);
                window.advance(word_id);
                if word_id == WORD_ID_DOT {
                    sentences += 1;
                }
            }

            render(model, &ids, &params.talk_init)
        })
        .collect()
}

/// §4.E.4: concatenate tokens, punctuation attaches with no leading space,
/// everything else gets a single leading space; trim; prepend `talk_init`.
fn render(model: &Model, ids: &[u32], talk_init: &str) -> String {
    let mut out = String::new();
    for &id in ids {
        let word = model.word(id);
        if is_punctuation(word) {
            out.push_str(word);
        } else {
            out.push(' ');
            out.push_str(word);
        }
    }
    let generated = out.trim_start().to_string();

    if talk_init.trim().is_empty() {
        generated
    } else {
        let starts_with_punct = generated
            .chars()
            .next()
            .is_some_and(|c| matches!(c, '.' | ',' | ';' | ':' | '?' | '!'));
        if !starts_with_punct {
            format!("{talk_init} {generated}")
        } else {
            format!("{talk_init}{generated}")
        }
    }
}
