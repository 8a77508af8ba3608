//! Thread reconstruction (§4.C): walk the sparse parent map from each
//! unresolved comment up to its owning story, counting levels and locating
//! the top-level ancestor's rank within the story's `kids` sequence.

use std::collections::{HashMap, HashSet};

/// The outcome of walking one comment's parent chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub comment_id: i64,
    pub story_id: i64,
    pub level: i64,
    pub ancestor_top: i64,
}

/// Walk `parents` from `comment_id` upward until the current parent is a
/// known story id (success) or absent from the map (orphan). The walk is
/// bounded by `max_steps` (total comment count) so a cyclic or malformed
/// parent map can never loop forever — any walk exceeding the bound is
/// reported as an orphan, same as a parent that's simply missing.
pub fn resolve_comment(
    comment_id: i64,
    parents: &HashMap<i64, i64>,
    known_stories: &HashSet<i64>,
    max_steps: usize,
) -> Option<Resolution> {
    let mut current = comment_id;
    let mut level = 0i64;

    for _ in 0..=max_steps {
        let Some(&parent) = parents.get(&current) else {
            return None;
        };

        level += 1;

        if known_stories.contains(&parent) {
            return Some(Resolution {
                comment_id,
                story_id: parent,
                level,
                ancestor_top: current,
            });
        }

        current = parent;
    }

    None
}

/// Resolve every comment in `parents` that isn't already a key of
/// `already_resolved`. Returns resolutions in a stable (sorted by comment
/// id) order; orphans are simply absent from the result.
pub fn resolve_all(
    comment_ids: &[i64],
    parents: &HashMap<i64, i64>,
    known_stories: &HashSet<i64>,
) -> Vec<Resolution> {
    let max_steps = comment_ids.len();
    let mut out: Vec<Resolution> = comment_ids
        .iter()
        .filter_map(|&id| resolve_comment(id, parents, known_stories, max_steps))
        .collect();
    out.sort_by_key(|r| r.comment_id);
    out
}

/// §4.C: `thread_rank` is the 1-based index of `ancestor_top` within the
/// story's `kids` sequence, or `0` if it isn't present there.
pub fn thread_rank(ancestor_top: i64, kids: &[i64]) -> i64 {
    kids.iter()
        .position(|&k| k == ancestor_top)
        .map(|i| (i + 1) as i64)
        .unwrap_or(0)
}
