//! Orchestrates components C, D, E (§2: Thread Resolver → Scorer → Markov
//! Engine) as the `rank` subcommand's single pass: resolve every
//! outstanding comment, score the resolved set, prune it to `commentLimit`,
//! build the n-gram model, and write the artifact.

use crate::ingest::{story_kids_by_id, unresolved_comment_ids};
use crate::markov::build::Builder;
use crate::markov::model::Model;
use crate::resolver::{resolve_comment, thread_rank};
use crate::scorer::{CommentPosition, score};
use crate::store::Store;
use eyre::Result;
use std::path::Path;

#[derive(Debug, Default, Clone, Copy)]
pub struct ResolveStats {
    pub resolved: u64,
    pub orphaned: u64,
}

/// Walk every unresolved comment's parent chain, write back its resolved
/// position, and bump its story's `comment_count`. Runs in one transaction.
pub fn resolve_outstanding(store: &mut Store) -> Result<ResolveStats> {
    let unresolved = unresolved_comment_ids(store)?;
    let parents = store.all_parents()?;
    let known_stories = store.known_story_ids()?;
    let kids_by_story = story_kids_by_id(store, &known_stories)?;
    let max_steps = parents.len();

    let mut stats = ResolveStats::default();

    store.transaction(|tx| {
        for comment_id in &unresolved {
            match resolve_comment(*comment_id, &parents, &known_stories, max_steps) {
                None => stats.orphaned += 1,
                Some(res) => {
                    let kids = kids_by_story.get(&res.story_id).map(Vec::as_slice).unwrap_or(&[]);
                    let rank = thread_rank(res.ancestor_top, kids);
                    Store::update_comment_position(tx, res.comment_id, res.story_id, rank, res.level)?;
                    Store::increment_story_comment_count(tx, res.story_id)?;
                    stats.resolved += 1;
                }
            }
        }
        Ok(())
    })?;

    Ok(stats)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RankStats {
    pub resolved: u64,
    pub orphaned: u64,
    pub scored: u64,
    pub zero_scored: u64,
    pub words: usize,
    pub keys: usize,
}

/// Full `rank` pass: resolve, score (optionally filtered), prune to
/// `comment_limit` (`<= 0` means unbounded), build the model, and write it
/// to `conf_path`.
pub fn run_rank(
    store: &mut Store,
    filter: Option<&str>,
    comment_limit: i64,
    conf_path: &Path,
) -> Result<RankStats> {
    let resolve_stats = resolve_outstanding(store)?;

    let matching = match filter {
        Some(f) => Some(store.comments_matching(f)?),
        None => None,
    };

    let resolved = store.resolved_comments()?;
    let mut scored = 0u64;
    let mut zero_scored = 0u64;

    store.transaction(|tx| {
        Store::reset_scores_table(tx)?;
        for comment in &resolved {
            if let Some(ref allowed) = matching
                && !allowed.contains(&comment.comment_id)
            {
                continue;
            }
            let s = score(CommentPosition {
                thread_rank: comment.thread_rank,
                level: comment.level,
                story_comment_count: comment.story_comment_count,
            });
            if s == 0 {
                zero_scored += 1;
                continue;
            }
            Store::insert_score(tx, comment.comment_id, s)?;
            scored += 1;
        }
        Ok(())
    })?;

    let texts = store.scored_comment_texts(comment_limit)?;

    let mut builder = Builder::new();
    for text in &texts {
        builder.ingest(text);
    }
    let (words, pruned) = builder.into_pruned();
    let word_count = words.len();
    let key_count = pruned.len();
    let model = Model::from_pruned(words, pruned);
    model.write(conf_path)?;

    Ok(RankStats {
        resolved: resolve_stats.resolved,
        orphaned: resolve_stats.orphaned,
        scored,
        zero_scored,
        words: word_count,
        keys: key_count,
    })
}
