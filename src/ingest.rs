//! Directory scan and per-line ingest orchestration (§6 skip rules,
//! §6.5 counters). The item shape and its decoding live in [`crate::item`];
//! this module is the glue that walks a directory, decides what to keep,
//! and writes it through the [`crate::store::Store`].

use crate::item::{Kind, parse_line};
use crate::normalize::normalize_comment;
use crate::store::Store;
use eyre::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Per-kind and per-skip-reason tallies, printed under `--verbose`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImportStats {
    pub total: u64,
    pub stories: u64,
    pub comments: u64,
    pub jobs: u64,
    pub polls: u64,
    pub poll_opts: u64,
    pub deleted: u64,
    pub empty_title: u64,
    pub empty_kids: u64,
    pub ask_hn: u64,
    pub empty_text: u64,
    pub files_skipped_known: u64,
    pub files_ingested: u64,
}

/// Ingest every regular file directly under `dir` whose name isn't already
/// in the store's known-files set, in a single transaction. Re-running over
/// an already-fully-known directory is therefore a no-op (§8 idempotent
/// import).
pub fn ingest_dir(store: &mut Store, dir: &Path, progress: &indicatif::ProgressBar) -> Result<ImportStats> {
    let known = store.known_files()?;
    let mut files: Vec<_> = fs::read_dir(dir)
        .wrap_err_with(|| format!("failed to read directory {}", dir.display()))?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .collect();
    files.sort_by_key(|e| e.file_name());

    let mut stats = ImportStats::default();

    store.transaction(|tx| {
        for entry in &files {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if known.contains(&file_name) {
                stats.files_skipped_known += 1;
                continue;
            }

            progress.set_message(format!("importing {file_name}"));
            ingest_file(tx, &entry.path(), &file_name, &mut stats)?;
            stats.files_ingested += 1;
            progress.tick();
        }
        Ok(())
    })?;

    Ok(stats)
}

fn ingest_file(
    tx: &rusqlite::Transaction,
    path: &Path,
    source_file: &str,
    stats: &mut ImportStats,
) -> Result<()> {
    let file = fs::File::open(path).wrap_err_with(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.wrap_err_with(|| format!("failed to read line {} of {}", line_no + 1, source_file))?;
        if line.trim().is_empty() {
            continue;
        }

        let item = parse_line(&line, source_file)
            .wrap_err_with(|| format!("line {} of {}", line_no + 1, source_file))?;
        stats.total += 1;

        if item.deleted {
            stats.deleted += 1;
            continue;
        }

        match item.kind {
            Kind::Story => {
                stats.stories += 1;
                let title = item.title.as_deref().unwrap_or("");
                if title.is_empty() {
                    stats.empty_title += 1;
                    continue;
                }
                if item.kids.is_empty() {
                    stats.empty_kids += 1;
                    continue;
                }
                if title.starts_with("Ask HN:") {
                    stats.ask_hn += 1;
                    continue;
                }
                Store::insert_story(tx, item.id, 0, source_file, title, &item.kids)?;
            }
            Kind::Comment => {
                stats.comments += 1;
                let text = item.text.as_deref().unwrap_or("");
                if text.is_empty() {
                    stats.empty_text += 1;
                    continue;
                }
                let parent = item.parent.unwrap_or(0);
                let normalized = normalize_comment(text);
                Store::insert_comment(tx, item.id, parent, source_file, &normalized)?;
            }
            Kind::Job => stats.jobs += 1,
            Kind::Poll => stats.polls += 1,
            Kind::PollOpt => stats.poll_opts += 1,
        }
    }

    Ok(())
}

/// All comment ids currently unresolved, used by the resolve step to
/// decide which comments still need a parent-chain walk.
pub fn unresolved_comment_ids(store: &Store) -> Result<Vec<i64>> {
    store.unresolved_comment_ids()
}

/// Comment kid lists for every known story, keyed by story id (§4.C).
pub fn story_kids_by_id(store: &Store, story_ids: &HashSet<i64>) -> Result<std::collections::HashMap<i64, Vec<i64>>> {
    let mut out = std::collections::HashMap::with_capacity(story_ids.len());
    for &id in story_ids {
        out.insert(id, store.story_kids(id)?);
    }
    Ok(out)
}
