//! Cross-module scenarios that exercise the full import → resolve → score →
//! build → talk pipeline against a real on-disk SQLite database.

use hackerbro::ingest::ingest_dir;
use hackerbro::markov::generate::{TalkParams, talk};
use hackerbro::markov::model::Model;
use hackerbro::pipeline::run_rank;
use hackerbro::store::Store;
use std::fs;
use tempfile::tempdir;

fn write_dump(dir: &std::path::Path, name: &str, lines: &[&str]) {
    fs::write(dir.join(name), lines.join("\n")).unwrap();
}

#[test]
fn import_and_resolve_assigns_thread_coordinates() {
    let dump_dir = tempdir().unwrap();
    let db_dir = tempdir().unwrap();
    write_dump(
        dump_dir.path(),
        "part1.ndjson",
        &[
            r#"{"id":1,"type":"story","title":"T","kids":[2]}"#,
            r#"{"id":2,"type":"comment","text":"Hello world.","parent":1}"#,
        ],
    );

    let mut store = Store::open(&db_dir.path().join("db.sqlite"), false).unwrap();
    let bar = indicatif::ProgressBar::hidden();
    ingest_dir(&mut store, dump_dir.path(), &bar).unwrap();

    let conf_path = db_dir.path().join("model.json");
    run_rank(&mut store, None, 0, &conf_path).unwrap();

    let resolved = store.resolved_comments().unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].story_id, 1);
    assert_eq!(resolved[0].thread_rank, 1);
    assert_eq!(resolved[0].level, 1);
    assert_eq!(store.story_comment_counts().unwrap(), vec![(1, 1)]);
}

#[test]
fn ask_hn_story_is_counted_but_not_stored() {
    let dump_dir = tempdir().unwrap();
    let db_dir = tempdir().unwrap();
    write_dump(
        dump_dir.path(),
        "part1.ndjson",
        &[r#"{"id":1,"type":"story","title":"Ask HN: what do you use?","kids":[2]}"#],
    );

    let mut store = Store::open(&db_dir.path().join("db.sqlite"), false).unwrap();
    let bar = indicatif::ProgressBar::hidden();
    let stats = ingest_dir(&mut store, dump_dir.path(), &bar).unwrap();

    assert_eq!(stats.ask_hn, 1);
    assert_eq!(store.story_count().unwrap(), 0);
}

#[test]
fn rank_then_talk_round_trips_through_disk() {
    let dump_dir = tempdir().unwrap();
    let db_dir = tempdir().unwrap();
    write_dump(
        dump_dir.path(),
        "part1.ndjson",
        &[
            r#"{"id":1,"type":"story","title":"T","kids":[2,3]}"#,
            r#"{"id":2,"type":"comment","text":"A B. A C.","parent":1}"#,
            r#"{"id":3,"type":"comment","text":"A B. A C.","parent":1}"#,
        ],
    );

    let mut store = Store::open(&db_dir.path().join("db.sqlite"), false).unwrap();
    let bar = indicatif::ProgressBar::hidden();
    ingest_dir(&mut store, dump_dir.path(), &bar).unwrap();

    let conf_path = db_dir.path().join("model.json");
    let stats = run_rank(&mut store, None, 0, &conf_path).unwrap();
    assert!(stats.scored > 0);

    let model = Model::read(&conf_path).unwrap();
    let params = TalkParams {
        continuity: 10,
        stability: 0,
        talk_init: String::new(),
        rand_init: 11,
        rand_talk: 22,
    };
    let utterances = talk(&model, 2, &params);
    assert_eq!(utterances.len(), 2);
    assert!(utterances.iter().all(|u| !u.is_empty()));
}

#[test]
fn rank_with_filter_only_includes_matching_comments() {
    let dump_dir = tempdir().unwrap();
    let db_dir = tempdir().unwrap();
    write_dump(
        dump_dir.path(),
        "part1.ndjson",
        &[
            r#"{"id":1,"type":"story","title":"T","kids":[2,3]}"#,
            r#"{"id":2,"type":"comment","text":"I love python scripting.","parent":1}"#,
            r#"{"id":3,"type":"comment","text":"rust is also nice.","parent":1}"#,
        ],
    );

    let mut store = Store::open(&db_dir.path().join("db.sqlite"), false).unwrap();
    let bar = indicatif::ProgressBar::hidden();
    ingest_dir(&mut store, dump_dir.path(), &bar).unwrap();

    let conf_path = db_dir.path().join("model.json");
    run_rank(&mut store, Some("python"), 0, &conf_path).unwrap();

    let matching = store.comments_matching("python").unwrap();
    assert_eq!(matching.len(), 1);
    assert!(matching.contains(&2));
    assert_eq!(store.scored_comment_count().unwrap() as usize, matching.len());
}

#[test]
fn reimporting_the_same_directory_adds_no_rows() {
    let dump_dir = tempdir().unwrap();
    let db_dir = tempdir().unwrap();
    write_dump(
        dump_dir.path(),
        "part1.ndjson",
        &[r#"{"id":1,"type":"story","title":"T","kids":[2]}"#],
    );

    let mut store = Store::open(&db_dir.path().join("db.sqlite"), false).unwrap();
    let bar = indicatif::ProgressBar::hidden();
    ingest_dir(&mut store, dump_dir.path(), &bar).unwrap();
    let before = store.story_count().unwrap();

    let second = ingest_dir(&mut store, dump_dir.path(), &bar).unwrap();
    assert_eq!(second.files_ingested, 0);
    assert_eq!(store.story_count().unwrap(), before);
}
